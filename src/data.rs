// src/data.rs - Session export of pose tracks and analysis results
use crate::analysis::AnalysisResult;
use crate::error::ExportError;
use crate::feedback::CoachingTip;
use crate::pose::JointId;
use crate::sequence::PoseSequence;
use chrono::Local;
use csv::Writer;
use serde::Serialize;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Debug, Serialize)]
struct AnalysisRecord<'a> {
    session: &'a str,
    exported_at: String,
    summary: String,
    result: &'a AnalysisResult,
    feedback: &'a [CoachingTip],
}

/// Writes one analysis session into `<output_dir>/<session_name>/`.
pub struct SessionExporter {
    output_dir: PathBuf,
    session_name: String,
}

impl SessionExporter {
    pub fn new(output_dir: impl AsRef<Path>, session_name: Option<String>) -> Self {
        let session_name = session_name
            .unwrap_or_else(|| format!("swing_{}", Local::now().format("%Y%m%d_%H%M%S")));

        Self {
            output_dir: output_dir.as_ref().to_path_buf(),
            session_name,
        }
    }

    pub fn session_name(&self) -> &str {
        &self.session_name
    }

    pub fn session_dir(&self) -> PathBuf {
        self.output_dir.join(&self.session_name)
    }

    /// One row per posed frame; absent joints leave their columns empty.
    pub fn export_sequence_csv(&self, sequence: &PoseSequence) -> Result<PathBuf, ExportError> {
        if sequence.is_empty() {
            return Err(ExportError::Empty("pose sequence has no frames".into()));
        }

        let csv_path = self.session_dir().join("pose_track.csv");
        fs::create_dir_all(self.session_dir())?;

        let mut writer = Writer::from_writer(File::create(&csv_path)?);

        let mut header = vec!["frame".to_string(), "timestamp".to_string()];
        for joint in JointId::ALL {
            header.push(format!("{}_x", joint.name()));
            header.push(format!("{}_y", joint.name()));
        }
        writer.write_record(&header)?;

        for (i, frame) in sequence.frames().iter().enumerate() {
            let mut row = vec![i.to_string(), format!("{:.6}", frame.timestamp)];
            for joint in JointId::ALL {
                match frame.joint(joint) {
                    Some(p) => {
                        row.push(format!("{:.6}", p.x));
                        row.push(format!("{:.6}", p.y));
                    }
                    None => {
                        row.push(String::new());
                        row.push(String::new());
                    }
                }
            }
            writer.write_record(&row)?;
        }

        writer.flush()?;
        info!(path = %csv_path.display(), frames = sequence.len(), "exported pose track");
        Ok(csv_path)
    }

    pub fn export_analysis_json(
        &self,
        result: &AnalysisResult,
        feedback: &[CoachingTip],
    ) -> Result<PathBuf, ExportError> {
        let json_path = self.session_dir().join("analysis.json");
        fs::create_dir_all(self.session_dir())?;

        let record = AnalysisRecord {
            session: &self.session_name,
            exported_at: Local::now().to_rfc3339(),
            summary: result.summary_chip(),
            result,
            feedback,
        };
        fs::write(&json_path, serde_json::to_string_pretty(&record)?)?;

        info!(path = %json_path.display(), "exported analysis");
        Ok(json_path)
    }
}
