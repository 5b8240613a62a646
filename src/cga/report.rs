//! Persisted run diagnostics.
//!
//! Write-only `;`-separated files under a diagnostics directory, one set
//! per run index:
//!
//! | File                           | Content                                  |
//! |--------------------------------|------------------------------------------|
//! | `quality_history{run}.csv`     | one quality sample per generation        |
//! | `excluded_individuals{run}.csv`| current exclusion pool, rewritten        |
//! | `clusters{run}.csv`            | current clustering, rewritten            |
//!
//! The optimizer never reads these back.

use super::clustering::ClusteringResult;
use super::exclusion::ExclusionPool;
use super::quality::QualitySample;
use crate::error::Result;
use std::fs::File;
use std::path::{Path, PathBuf};

const DELIMITER: u8 = b';';

/// Writes the diagnostics of one run.
pub struct DiagnosticsWriter {
    dir: PathBuf,
    run: usize,
    quality: csv::Writer<File>,
}

impl std::fmt::Debug for DiagnosticsWriter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiagnosticsWriter")
            .field("dir", &self.dir)
            .field("run", &self.run)
            .finish()
    }
}

impl DiagnosticsWriter {
    /// Creates `dir` if needed and starts the quality history of `run`.
    ///
    /// # Errors
    /// I/O or CSV errors creating the directory or the history file.
    pub fn create(dir: impl AsRef<Path>, run: usize) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&dir)?;
        let mut quality = writer(&dir.join(format!("quality_history{run}.csv")))?;
        quality.write_record(["cost", "hypervolume", "igd", "reference-distance"])?;
        quality.flush()?;
        Ok(Self { dir, run, quality })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn quality_path(&self) -> PathBuf {
        self.dir.join(format!("quality_history{}.csv", self.run))
    }

    pub fn excluded_path(&self) -> PathBuf {
        self.dir.join(format!("excluded_individuals{}.csv", self.run))
    }

    pub fn clusters_path(&self) -> PathBuf {
        self.dir.join(format!("clusters{}.csv", self.run))
    }

    /// Appends one line to the quality history.
    pub fn write_quality(&mut self, sample: &QualitySample) -> Result<()> {
        self.quality.write_record([
            sample.cost.to_string(),
            sample.hypervolume.to_string(),
            sample.igd.to_string(),
            sample.reference_distance.to_string(),
        ])?;
        self.quality.flush()?;
        Ok(())
    }

    /// Rewrites the exclusion-pool report.
    pub fn write_excluded<S: Clone>(&self, pool: &ExclusionPool<S>) -> Result<()> {
        let arity = pool.iter().next().map_or(0, |i| i.objectives().len());
        let mut out = writer(&self.excluded_path())?;

        let mut header: Vec<String> = [
            "usage",
            "adjusted usage",
            "unsuccessful usage",
            "adjusted unsuccessful usage",
            "times excluded",
            "exclusion counter",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();
        header.extend((0..arity).map(|k| format!("obj {k}")));
        header.extend((0..arity).map(|k| format!("norm obj {k}")));
        out.write_record(&header)?;

        for ind in pool.iter() {
            let usage = ind.usage();
            let exclusion = ind.exclusion();
            let mut row = vec![
                usage.usage.to_string(),
                usage.adjusted_usage.to_string(),
                usage.unsuccessful.to_string(),
                usage.adjusted_unsuccessful.to_string(),
                exclusion.times_excluded.to_string(),
                exclusion.generation_counter.to_string(),
            ];
            row.extend(ind.objectives().iter().map(f64::to_string));
            row.extend(ind.normalized_objectives().iter().map(f64::to_string));
            out.write_record(&row)?;
        }
        out.flush()?;
        Ok(())
    }

    /// Rewrites the clustering report.
    pub fn write_clusters(&self, clustering: &ClusteringResult) -> Result<()> {
        let arity = clustering.clusters().first().map_or(0, |c| c.centroid().len());
        let mut out = writer(&self.clusters_path())?;

        let mut header: Vec<String> = ["cluster", "size", "dispersion", "centroid usage"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        header.extend((0..arity).map(|k| format!("centroid {k}")));
        out.write_record(&header)?;

        for (c, cluster) in clustering.clusters().iter().enumerate() {
            let mut row = vec![
                c.to_string(),
                cluster.len().to_string(),
                cluster.dispersion().to_string(),
                cluster.centroid_usage().to_string(),
            ];
            row.extend(cluster.centroid().iter().map(f64::to_string));
            out.write_record(&row)?;
        }
        out.flush()?;
        Ok(())
    }
}

fn writer(path: &Path) -> Result<csv::Writer<File>> {
    Ok(csv::WriterBuilder::new()
        .delimiter(DELIMITER)
        .flexible(true)
        .from_path(path)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cga::clustering::{Cluster, ClusterMember};
    use crate::cga::types::Individual;

    fn sample(cost: usize) -> QualitySample {
        QualitySample {
            cost,
            hypervolume: 1.5,
            igd: f64::NAN,
            reference_distance: 0.25,
        }
    }

    #[test]
    fn test_quality_history() {
        let dir = tempfile::tempdir().unwrap();
        let mut w = DiagnosticsWriter::create(dir.path(), 3).unwrap();
        w.write_quality(&sample(10)).unwrap();
        w.write_quality(&sample(12)).unwrap();

        let text = std::fs::read_to_string(dir.path().join("quality_history3.csv")).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "cost;hypervolume;igd;reference-distance");
        assert_eq!(lines[1], "10;1.5;NaN;0.25");
        assert_eq!(lines.len(), 3);
    }

    #[test]
    fn test_creates_missing_dir() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("a").join("b");
        let w = DiagnosticsWriter::create(&nested, 0).unwrap();
        assert!(w.quality_path().exists());
    }

    #[test]
    fn test_excluded_report() {
        let dir = tempfile::tempdir().unwrap();
        let w = DiagnosticsWriter::create(dir.path(), 0).unwrap();

        let mut archive = vec![
            Individual::from_parts(0, vec![0], (), vec![1.0, 2.0], vec![0.0, 1.0]),
            Individual::from_parts(1, vec![1], (), vec![2.0, 1.0], vec![1.0, 0.0]),
        ];
        archive[0].record_usage();
        archive[0].record_unsuccessful_usage();
        archive[0].record_unsuccessful_usage();
        let mut pool = ExclusionPool::new();
        assert_eq!(pool.exclude_overused(&mut archive, 1, 3), 1);

        w.write_excluded(&pool).unwrap();
        let text = std::fs::read_to_string(w.excluded_path()).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(
            lines[0],
            "usage;adjusted usage;unsuccessful usage;adjusted unsuccessful usage;\
             times excluded;exclusion counter;obj 0;obj 1;norm obj 0;norm obj 1"
        );
        assert_eq!(lines[1], "1;0;2;0;1;3;1;2;0;1");
    }

    #[test]
    fn test_clusters_report() {
        let dir = tempfile::tempdir().unwrap();
        let w = DiagnosticsWriter::create(dir.path(), 1).unwrap();
        let mut cluster = Cluster::new(
            vec![0.5, 0.5],
            vec![ClusterMember {
                index: 0,
                distance: 0.0,
            }],
            2.0,
        );
        cluster.record_centroid_usage();
        let clustering = ClusteringResult::new(vec![cluster], 4);

        w.write_clusters(&clustering).unwrap();
        let text = std::fs::read_to_string(dir.path().join("clusters1.csv")).unwrap();
        assert_eq!(
            text,
            "cluster;size;dispersion;centroid usage;centroid 0;centroid 1\n0;1;2;1;0.5;0.5\n"
        );
    }
}
