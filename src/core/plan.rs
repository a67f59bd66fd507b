//! Ordered generation task list.
//!
//! A [`GenerationPlan`] flattens a blueprint into the exact sequence of work
//! a run performs: sections in fixed order, files in manifest order, each
//! file carrying its progress ordinal and its related-files context.

use std::path::{Path, PathBuf};

use crate::domain::{Blueprint, FileEntry, SectionName};

/// One file to generate
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileTask {
    /// 1-based position across the whole plan (progress `k` in `k/total`)
    pub ordinal: usize,

    /// Path relative to the section's output directory
    pub path: String,

    /// Purpose text from the blueprint
    pub purpose: String,

    /// Every other file of the same section, in manifest order
    pub related_files: Vec<FileEntry>,
}

/// The files of one section
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectionPlan {
    pub name: SectionName,

    /// Framework label ("Unknown" when the blueprint names none)
    pub framework: String,

    pub tasks: Vec<FileTask>,
}

impl SectionPlan {
    /// Output directory of this section below a project root
    pub fn base_dir(&self, project_root: &Path) -> PathBuf {
        match self.name.subdir() {
            Some(subdir) => project_root.join(subdir),
            None => project_root.to_path_buf(),
        }
    }
}

/// Ordered task list for one run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationPlan {
    pub sections: Vec<SectionPlan>,
    total_files: usize,
}

impl GenerationPlan {
    /// Build the plan; sections absent from the blueprint are skipped
    pub fn from_blueprint(blueprint: &Blueprint) -> Self {
        let mut ordinal = 0;
        let mut sections = Vec::new();

        for (name, section) in blueprint.sections() {
            let tasks = section
                .files
                .iter()
                .enumerate()
                .map(|(idx, file)| {
                    ordinal += 1;
                    FileTask {
                        ordinal,
                        path: file.path.clone(),
                        purpose: file.purpose.clone(),
                        related_files: section
                            .files
                            .iter()
                            .enumerate()
                            .filter(|(other, _)| *other != idx)
                            .map(|(_, f)| f.clone())
                            .collect(),
                    }
                })
                .collect();

            sections.push(SectionPlan {
                name,
                framework: section.framework_or_unknown().to_string(),
                tasks,
            });
        }

        Self {
            sections,
            total_files: ordinal,
        }
    }

    /// Number of files across all sections
    pub fn total_files(&self) -> usize {
        self.total_files
    }

    /// Every task with its section, in execution order
    pub fn tasks(&self) -> impl Iterator<Item = (&SectionPlan, &FileTask)> {
        self.sections
            .iter()
            .flat_map(|section| section.tasks.iter().map(move |task| (section, task)))
    }
}
