//! Text extraction from PDF, DOCX and TXT files.
//!
//! PDF and DOCX support sit behind the `pdf` and `office` features.

use anyhow::{Context, Result};
use docsort_core::models::SourceFormat;
use docsort_core::normalizer::decode_lossy;
use std::path::Path;
use tracing::debug;

#[derive(Debug, Clone)]
pub struct Extracted {
    pub filename: String,
    pub format: SourceFormat,
    pub text: String,
}

pub fn format_of(path: &Path) -> Result<SourceFormat> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .with_context(|| format!("{} has no file extension", path.display()))?;
    SourceFormat::from_extension(ext)
        .with_context(|| format!("unsupported file type .{} (expected pdf, docx or txt)", ext))
}

pub fn read_document(path: &Path) -> Result<Extracted> {
    let format = format_of(path)?;
    let filename = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    let text = match format {
        SourceFormat::Txt => {
            let bytes = std::fs::read(path).with_context(|| format!("reading {}", path.display()))?;
            decode_lossy(&bytes).into_owned()
        }
        SourceFormat::Pdf => read_pdf(path)?,
        SourceFormat::Docx => read_docx(path)?,
    };
    debug!(%filename, %format, chars = text.chars().count(), "text extracted");
    Ok(Extracted {
        filename,
        format,
        text,
    })
}

#[cfg(feature = "pdf")]
fn read_pdf(path: &Path) -> Result<String> {
    pdf_extract::extract_text(path).with_context(|| format!("extracting text from {}", path.display()))
}

#[cfg(not(feature = "pdf"))]
fn read_pdf(path: &Path) -> Result<String> {
    anyhow::bail!(
        "cannot read {}: PDF support is not enabled (rebuild with --features pdf)",
        path.display()
    )
}

#[cfg(feature = "office")]
fn read_docx(path: &Path) -> Result<String> {
    use quick_xml::events::Event;
    use quick_xml::Reader;
    use std::io::Read;

    let file = std::fs::File::open(path).with_context(|| format!("opening {}", path.display()))?;
    let mut archive = zip::ZipArchive::new(file).context("not a DOCX archive")?;
    let mut xml = String::new();
    archive
        .by_name("word/document.xml")
        .context("DOCX archive has no word/document.xml")?
        .read_to_string(&mut xml)?;

    let mut reader = Reader::from_str(&xml);
    let mut text = String::new();
    let mut in_run_text = false;
    loop {
        match reader.read_event()? {
            Event::Start(e) if e.name().as_ref() == b"w:t" => in_run_text = true,
            Event::End(e) => match e.name().as_ref() {
                b"w:t" => in_run_text = false,
                b"w:p" => text.push('\n'),
                _ => {}
            },
            Event::Empty(e) if matches!(e.name().as_ref(), b"w:tab" | b"w:br") => text.push(' '),
            Event::Text(t) if in_run_text => text.push_str(&t.unescape()?),
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(text)
}

#[cfg(not(feature = "office"))]
fn read_docx(path: &Path) -> Result<String> {
    anyhow::bail!(
        "cannot read {}: DOCX support is not enabled (rebuild with --features office)",
        path.display()
    )
}
