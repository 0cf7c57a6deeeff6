use crate::draw::draw_artifact;
use crate::figure::{ChartArtifact, OutputFormat};
use anyhow::{anyhow, Context, Result};
use plotters::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};
use svg2pdf::usvg;
use svg2pdf::usvg::fontdb::{Database, Family, Query};
use tempfile::TempPath;
use tracing::{debug, warn};

/// Mode of published figures; temp files start out owner-only
#[cfg(unix)]
const PUBLISHED_MODE: u32 = 0o644;

/// Persists chart artifacts into a single output directory.
#[derive(Debug, Clone)]
pub struct OutputWriter {
    dir: PathBuf,
}

impl OutputWriter {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, artifact: &ChartArtifact, format: OutputFormat) -> PathBuf {
        self.dir
            .join(format!("{}.{}", artifact.base_name(), format.extension()))
    }

    /// Write `artifact` in every requested format.
    ///
    /// Each format is first drawn into a temporary file next to its final
    /// location; the temporaries are only renamed into place once all formats
    /// rendered. If a rename fails, the files this call already renamed are
    /// removed again, so an artifact is published in all formats or none.
    pub fn write(&self, artifact: &ChartArtifact) -> Result<Vec<PathBuf>> {
        fs::create_dir_all(&self.dir).with_context(|| {
            format!("Failed to create output directory {}", self.dir.display())
        })?;

        let mut staged: Vec<(TempPath, PathBuf)> = Vec::with_capacity(artifact.formats.len());
        for &format in &artifact.formats {
            let target = self.path_for(artifact, format);
            let temp = self.stage(artifact, format)?;
            render_to_file(artifact, format, &temp)
                .with_context(|| format!("Failed to render {}", target.display()))?;
            staged.push((temp, target));
        }

        let mut written = Vec::with_capacity(staged.len());
        for (temp, target) in staged {
            if let Err(err) = temp.persist(&target) {
                discard(&written);
                return Err(anyhow::Error::new(err.error)
                    .context(format!("Failed to write {}", target.display())));
            }
            debug!(path = %target.display(), "persisted figure");
            written.push(target);
        }

        Ok(written)
    }

    fn stage(&self, artifact: &ChartArtifact, format: OutputFormat) -> Result<TempPath> {
        let prefix = format!(".{}-", artifact.base_name());
        let suffix = format!(".{}", format.extension());
        let file = tempfile::Builder::new()
            .prefix(&prefix)
            .suffix(&suffix)
            .tempfile_in(&self.dir)
            .with_context(|| format!("Failed to create temporary file in {}", self.dir.display()))?;
        set_published_permissions(file.path())?;
        Ok(file.into_temp_path())
    }
}

fn discard(paths: &[PathBuf]) {
    for path in paths {
        if let Err(err) = fs::remove_file(path) {
            warn!(path = %path.display(), error = %err, "failed to remove partially published figure");
        }
    }
}

#[cfg(unix)]
fn set_published_permissions(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(PUBLISHED_MODE))
        .with_context(|| format!("Failed to set permissions on {}", path.display()))
}

#[cfg(not(unix))]
fn set_published_permissions(_path: &Path) -> Result<()> {
    Ok(())
}

/// Draw `artifact` to `path`. The encoding is chosen by `format`, not by the
/// path's extension.
pub fn render_to_file(artifact: &ChartArtifact, format: OutputFormat, path: &Path) -> Result<()> {
    match format {
        OutputFormat::Pdf => {
            let pdf = render_pdf(artifact)?;
            fs::write(path, pdf).with_context(|| format!("Failed to write {}", path.display()))?;
        }
        OutputFormat::Png => {
            let root = BitMapBackend::new(path, artifact.size()).into_drawing_area();
            draw_artifact(&root, artifact)?;
            root.present()?;
        }
    }
    Ok(())
}

/// Draw `artifact` as an SVG document held in memory.
pub fn render_svg(artifact: &ChartArtifact) -> Result<String> {
    let mut svg = String::new();
    {
        let root = SVGBackend::with_string(&mut svg, artifact.size()).into_drawing_area();
        draw_artifact(&root, artifact)?;
        root.present()?;
    }
    Ok(svg)
}

/// Draw `artifact` as SVG and convert it into a single-page PDF.
pub fn render_pdf(artifact: &ChartArtifact) -> Result<Vec<u8>> {
    let svg = render_svg(artifact)?;

    let mut options = usvg::Options::default();
    options.fontdb = font_database();
    let tree = usvg::Tree::from_str(&svg, &options)
        .with_context(|| format!("Failed to parse the {} drawing", artifact.base_name()))?;

    svg2pdf::to_pdf(
        &tree,
        svg2pdf::ConversionOptions::default(),
        svg2pdf::PageOptions::default(),
    )
    .map_err(|err| anyhow!("Failed to convert {} to PDF: {:?}", artifact.base_name(), err))
}

/// System fonts, loaded once. Generic families fall back to the first
/// installed face when the platform defaults are missing.
fn font_database() -> Arc<Database> {
    static FONTS: OnceLock<Arc<Database>> = OnceLock::new();
    FONTS
        .get_or_init(|| {
            let mut db = Database::new();
            db.load_system_fonts();

            let fallback = db
                .faces()
                .next()
                .and_then(|face| face.families.first())
                .map(|(name, _)| name.clone());
            if let Some(fallback) = fallback {
                if !has_family(&db, Family::SansSerif) {
                    db.set_sans_serif_family(fallback.clone());
                }
                if !has_family(&db, Family::Serif) {
                    db.set_serif_family(fallback);
                }
            }

            debug!(faces = db.len(), "loaded system fonts");
            Arc::new(db)
        })
        .clone()
}

fn has_family(db: &Database, family: Family<'_>) -> bool {
    let query = Query {
        families: &[family],
        ..Query::default()
    };
    db.query(&query).is_some()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::DerivedMetrics;
    use crate::reference;
    use crate::render::Renderer;
    use crate::style::Style;
    use tempfile::{NamedTempFile, TempDir};

    fn artifact() -> ChartArtifact {
        let metrics = DerivedMetrics::compute(&reference::benchmark_result().unwrap());
        Renderer::new(Style::default()).latency_distribution(&metrics)
    }

    fn entries(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    #[test]
    fn test_paths_use_base_name_and_extension() {
        let writer = OutputWriter::new("docs/thesis/figures");
        let artifact = artifact();
        assert_eq!(
            writer.path_for(&artifact, OutputFormat::Pdf),
            Path::new("docs/thesis/figures/latency_distribution.pdf")
        );
        assert_eq!(
            writer.path_for(&artifact, OutputFormat::Png),
            Path::new("docs/thesis/figures/latency_distribution.png")
        );
    }

    #[test]
    fn test_uncreatable_directory_is_reported() {
        // A regular file cannot be a parent directory
        let blocker = NamedTempFile::new().unwrap();
        let writer = OutputWriter::new(blocker.path().join("figures"));

        let err = writer.write(&artifact()).unwrap_err();
        assert!(format!("{err:#}").contains("Failed to create output directory"));
    }

    #[test]
    fn test_nothing_written_without_formats() {
        let dir = TempDir::new().unwrap();
        let writer = OutputWriter::new(dir.path().join("nested/figures"));

        let mut artifact = artifact();
        artifact.formats.clear();

        assert!(writer.write(&artifact).unwrap().is_empty());
        assert!(writer.dir().is_dir());
        assert!(entries(writer.dir()).is_empty());
    }

    #[cfg(unix)]
    #[test]
    fn test_staged_files_are_world_readable() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let writer = OutputWriter::new(dir.path());

        let temp = writer.stage(&artifact(), OutputFormat::Png).unwrap();
        let mode = fs::metadata(&temp).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, PUBLISHED_MODE);
    }

    #[test]
    fn test_writes_pdf_and_png() {
        let dir = TempDir::new().unwrap();
        let writer = OutputWriter::new(dir.path());

        let written = writer.write(&artifact()).unwrap();
        assert_eq!(
            written,
            [
                dir.path().join("latency_distribution.pdf"),
                dir.path().join("latency_distribution.png"),
            ]
        );

        let pdf = fs::read(&written[0]).unwrap();
        assert!(pdf.starts_with(b"%PDF"));
        let png = fs::read(&written[1]).unwrap();
        assert!(png.starts_with(b"\x89PNG"));

        // No leftover temporaries
        assert_eq!(
            entries(dir.path()),
            ["latency_distribution.pdf", "latency_distribution.png"]
        );

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            for path in &written {
                let mode = fs::metadata(path).unwrap().permissions().mode();
                assert_eq!(mode & 0o777, PUBLISHED_MODE, "{}", path.display());
            }
        }
    }

    #[test]
    fn test_failed_publish_leaves_nothing_behind() {
        let dir = TempDir::new().unwrap();
        // A directory at the PNG target makes its rename fail after the PDF
        // has already been moved into place
        let blocker = dir.path().join("latency_distribution.png");
        fs::create_dir(&blocker).unwrap();
        fs::write(blocker.join("keep"), b"x").unwrap();

        let writer = OutputWriter::new(dir.path());
        let err = writer.write(&artifact()).unwrap_err();

        assert!(format!("{err:#}").contains("latency_distribution.png"));
        assert!(!dir.path().join("latency_distribution.pdf").exists());
        assert_eq!(entries(dir.path()), ["latency_distribution.png"]);
    }

    #[test]
    fn test_pdf_is_single_document() {
        let pdf = render_pdf(&artifact()).unwrap();
        assert!(pdf.starts_with(b"%PDF"));
        assert!(pdf.windows(5).any(|w| w == b"%%EOF"));
    }
}
