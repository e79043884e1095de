//! PDF rendering of concert programs
//!
//! `layout` positions everything, `pdf` paints it, and [`ProgramRenderer`]
//! puts the result on disk where the web server can serve it.

pub mod layout;
pub mod pdf;
pub mod text;

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Instant;

use tracing::info;
use uuid::Uuid;

use crate::metrics::PDF_RENDER_TIME;
use crate::program::ConcertProgram;
use crate::theme::Theme;

pub use layout::{layout_program, DrawOp, Heading, Page};
pub use pdf::render_pdf;

/// Name of the generated file inside the static directory
pub const OUTPUT_FILE_NAME: &str = "concert_program.pdf";

/// Errors that can occur while producing a PDF
#[derive(Debug)]
pub enum RenderError {
    /// The PDF library rejected the document
    Pdf(String),
    /// Writing the file failed
    Io(std::io::Error),
}

impl fmt::Display for RenderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RenderError::Pdf(e) => write!(f, "PDF generation failed: {}", e),
            RenderError::Io(e) => write!(f, "failed to write PDF: {}", e),
        }
    }
}

impl std::error::Error for RenderError {}

impl From<std::io::Error> for RenderError {
    fn from(e: std::io::Error) -> Self {
        RenderError::Io(e)
    }
}

/// Writes program PDFs into a fixed directory
#[derive(Debug, Clone)]
pub struct ProgramRenderer {
    output_dir: PathBuf,
}

impl ProgramRenderer {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Where [`write`](Self::write) puts the PDF
    pub fn output_path(&self) -> PathBuf {
        self.output_dir.join(OUTPUT_FILE_NAME)
    }

    /// Lay out, paint and write the program. Readers never see a partial file:
    /// the bytes go to a temporary file that is renamed into place.
    pub fn write(&self, program: &ConcertProgram, theme: &Theme, heading: &Heading) -> Result<PathBuf, RenderError> {
        let start = Instant::now();

        let pages = layout_program(program, theme, heading);
        let bytes = render_pdf(&pages, &heading.title)?;

        std::fs::create_dir_all(&self.output_dir)?;
        let path = self.output_path();
        // One temp file per write; concurrent renders each rename their own
        let tmp = self
            .output_dir
            .join(format!(".{}.{}.tmp", OUTPUT_FILE_NAME, Uuid::now_v7()));
        if let Err(e) = std::fs::write(&tmp, &bytes).and_then(|_| std::fs::rename(&tmp, &path)) {
            let _ = std::fs::remove_file(&tmp);
            return Err(e.into());
        }

        PDF_RENDER_TIME.observe(start.elapsed().as_secs_f64());
        info!(
            path = %path.display(),
            pages = pages.len(),
            bytes = bytes.len(),
            theme = %theme.name,
            "Program PDF written"
        );
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::program::Performance;

    #[test]
    fn test_write_creates_pdf_in_output_dir() {
        let dir = tempfile::tempdir().unwrap();
        let renderer = ProgramRenderer::new(dir.path().join("static"));
        let program = ConcertProgram {
            performances: vec![Performance::new(1, "Emma Li", "Clair de Lune", "Piano", Some(5))],
            ..Default::default()
        };
        let heading = Heading {
            title: "Concert Program".to_string(),
            ..Default::default()
        };

        let path = renderer.write(&program, &Theme::default(), &heading).unwrap();
        assert_eq!(path, renderer.output_path());
        let bytes = std::fs::read(&path).unwrap();
        assert!(bytes.starts_with(b"%PDF"));

        // no temp file left behind
        let leftovers: Vec<_> = std::fs::read_dir(renderer.output_dir())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().ends_with(".tmp"))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[test]
    fn test_concurrent_writes_all_land_whole() {
        let dir = tempfile::tempdir().unwrap();
        let renderer = ProgramRenderer::new(dir.path());
        let program = ConcertProgram {
            performances: (1..=12)
                .map(|i| Performance::new(i, "Emma Li", "Clair de Lune (Debussy)", "Piano", Some(5)))
                .collect(),
            ..Default::default()
        };
        let heading = Heading {
            title: "Spring Recital".to_string(),
            ..Default::default()
        };

        for _ in 0..10 {
            let handles: Vec<_> = (0..4)
                .map(|_| {
                    let renderer = renderer.clone();
                    let program = program.clone();
                    let heading = heading.clone();
                    std::thread::spawn(move || renderer.write(&program, &Theme::default(), &heading))
                })
                .collect();
            for handle in handles {
                handle.join().unwrap().unwrap();
            }
        }

        let bytes = std::fs::read(renderer.output_path()).unwrap();
        assert!(bytes.starts_with(b"%PDF"));
        let leftovers = std::fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().ends_with(".tmp"))
            .count();
        assert_eq!(leftovers, 0);
    }
}
