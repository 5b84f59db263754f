//! The two-tier package format detector
//!
//! Tier 1 is the fast path: if a package's file set matches exactly one
//! platform's marker globs (or only the universal layout's), that settles it
//! at full confidence. Tier 2 scores every file against every registered
//! frontmatter schema and aggregates the distribution: a single observed
//! format wins outright, a dominant one (>70%) wins with a confidence
//! penalty, anything else is `mixed`.

use camino::Utf8PathBuf;
use openpackage_schema::SortedMap;
use tracing::debug;

use crate::platforms::{
    platforms, universal_markers, universal_schemas, FieldKind, FileSchema, PlatformSpec,
    UNIVERSAL,
};
use crate::PackageFile;

/// Confidence boost for a file whose path matches the schema's flow glob
const FLOW_GLOB_BOOST: f32 = 0.2;
/// Extra confidence when an exclusive field matched
const EXCLUSIVE_BOOST: f32 = 0.25;
/// Confidence for files classified by directory structure alone
const PATH_ONLY_CONFIDENCE: f32 = 0.6;
/// A format is dominant when it covers more than this share of files
const DOMINANCE_THRESHOLD: f32 = 0.7;
/// Confidence factor when a dominant (but not sole) format exists
const DOMINANT_PENALTY: f32 = 0.85;
/// Confidence factor when the distribution is ambiguous
const AMBIGUOUS_PENALTY: f32 = 0.6;

/// The group name files land in when nothing classifies them
pub const UNKNOWN_GROUP: &str = "unknown";

/// What format a package turned out to be
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PackageFormat {
    /// One vendor platform's layout
    Platform(&'static str),
    /// The neutral layout
    Universal,
    /// Several formats side by side
    Mixed,
    /// Nothing we recognize
    Unknown,
}

impl PackageFormat {
    /// The string id of this format (`claude`, `universal`, `mixed`, ...)
    pub fn id(&self) -> &str {
        match self {
            PackageFormat::Platform(id) => id,
            PackageFormat::Universal => UNIVERSAL,
            PackageFormat::Mixed => "mixed",
            PackageFormat::Unknown => UNKNOWN_GROUP,
        }
    }
}

impl std::fmt::Display for PackageFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.id())
    }
}

/// How the package-level verdict was reached
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetectionMethod {
    /// A platform marker settled it
    PackageMarker,
    /// Per-file frontmatter scoring settled it
    PerFile,
    /// Only directory structure was available
    DirectoryStructure,
}

/// The per-file verdict
#[derive(Debug, Clone, PartialEq)]
pub struct FileFormat {
    /// The format id the file scored highest against
    pub format: String,
    /// How confident the score was, in `[0, 1]`
    pub confidence: f32,
}

/// Distribution counts backing the package-level verdict
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FormatAnalysis {
    /// How many files the package has
    pub total_files: usize,
    /// How many of them were classified
    pub classified_files: usize,
    /// Classified files per format id
    pub distribution: SortedMap<String, usize>,
}

/// The detector's full output
#[derive(Debug, Clone)]
pub struct DetectedFormat {
    /// The package-level verdict
    pub package_format: PackageFormat,
    /// How it was reached
    pub detection_method: DetectionMethod,
    /// Package-level confidence in `[0, 1]`
    pub confidence: f32,
    /// Per-file verdicts, keyed by relative path
    pub file_formats: SortedMap<String, FileFormat>,
    /// Files grouped by format id; unclassifiable files land in
    /// [`UNKNOWN_GROUP`][]
    pub format_groups: SortedMap<String, Vec<Utf8PathBuf>>,
    /// The marker globs that fired, if tier 1 decided
    pub markers: Vec<String>,
    /// Distribution counts
    pub analysis: FormatAnalysis,
}

impl DetectedFormat {
    /// Format ids in descending share of the distribution
    ///
    /// This is the tie-break order the converter's merge uses.
    pub fn distribution_order(&self) -> Vec<String> {
        let mut formats: Vec<(&String, &usize)> = self.analysis.distribution.iter().collect();
        formats.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));
        formats.into_iter().map(|(id, _)| id.clone()).collect()
    }
}

/// Detect the format of a package from its file set
pub fn detect_format(files: &[PackageFile]) -> DetectedFormat {
    if let Some(detected) = detect_by_markers(files) {
        return detected;
    }
    detect_per_file(files)
}

/// Tier 1: marker matching
fn detect_by_markers(files: &[PackageFile]) -> Option<DetectedFormat> {
    let matched_platforms: Vec<&PlatformSpec> = platforms()
        .iter()
        .filter(|platform| {
            files
                .iter()
                .any(|file| platform.matches_marker(file.rel_path.as_str()))
        })
        .collect();
    let universal_matched = files.iter().any(|file| {
        universal_markers().iter().any(|marker| {
            glob::Pattern::new(marker)
                .map(|pattern| pattern.matches(file.rel_path.as_str()))
                .unwrap_or(false)
        })
    });

    let (format, markers) = match (matched_platforms.as_slice(), universal_matched) {
        ([platform], false) => (
            PackageFormat::Platform(platform.id),
            platform.markers.clone(),
        ),
        ([], true) => (
            PackageFormat::Universal,
            universal_markers().iter().map(|m| m.to_string()).collect(),
        ),
        _ => return None,
    };

    debug!("package marker matched: {format}");
    let all_files: Vec<Utf8PathBuf> = files.iter().map(|file| file.rel_path.clone()).collect();
    let mut format_groups = SortedMap::new();
    format_groups.insert(format.id().to_owned(), all_files);
    let mut distribution = SortedMap::new();
    distribution.insert(format.id().to_owned(), files.len());
    Some(DetectedFormat {
        detection_method: DetectionMethod::PackageMarker,
        confidence: 1.0,
        file_formats: SortedMap::new(),
        format_groups,
        markers,
        analysis: FormatAnalysis {
            total_files: files.len(),
            classified_files: files.len(),
            distribution,
        },
        package_format: format,
    })
}

/// Tier 2: per-file schema scoring
fn detect_per_file(files: &[PackageFile]) -> DetectedFormat {
    let mut file_formats = SortedMap::new();
    let mut format_groups: SortedMap<String, Vec<Utf8PathBuf>> = SortedMap::new();
    let mut distribution: SortedMap<String, usize> = SortedMap::new();
    let mut any_frontmatter_classified = false;
    let mut confidence_sum = 0.0f32;

    for file in files {
        let verdict = classify_file(file);
        match verdict {
            Some((format, confidence, via_frontmatter)) => {
                any_frontmatter_classified |= via_frontmatter;
                confidence_sum += confidence;
                *distribution.entry(format.clone()).or_default() += 1;
                format_groups
                    .entry(format.clone())
                    .or_default()
                    .push(file.rel_path.clone());
                file_formats.insert(
                    file.rel_path.to_string(),
                    FileFormat { format, confidence },
                );
            }
            None => {
                format_groups
                    .entry(UNKNOWN_GROUP.to_owned())
                    .or_default()
                    .push(file.rel_path.clone());
            }
        }
    }

    let classified: usize = distribution.values().sum();
    let (package_format, consistency) = if classified == 0 {
        (PackageFormat::Unknown, 0.0)
    } else if distribution.len() == 1 {
        let id = distribution.keys().next().unwrap().clone();
        (format_from_id(&id), 1.0)
    } else {
        let (top_id, top_count) = distribution
            .iter()
            .max_by(|a, b| a.1.cmp(b.1).then_with(|| b.0.cmp(a.0)))
            .map(|(id, count)| (id.clone(), *count))
            .unwrap();
        if top_count as f32 / classified as f32 > DOMINANCE_THRESHOLD {
            (format_from_id(&top_id), DOMINANT_PENALTY)
        } else {
            (PackageFormat::Mixed, AMBIGUOUS_PENALTY)
        }
    };

    let avg_confidence = if classified == 0 {
        0.0
    } else {
        confidence_sum / classified as f32
    };
    DetectedFormat {
        package_format,
        detection_method: if any_frontmatter_classified {
            DetectionMethod::PerFile
        } else {
            DetectionMethod::DirectoryStructure
        },
        confidence: (avg_confidence * consistency).clamp(0.0, 1.0),
        file_formats,
        format_groups,
        markers: Vec::new(),
        analysis: FormatAnalysis {
            total_files: files.len(),
            classified_files: classified,
            distribution,
        },
    }
}

/// Score one file against every registered schema
///
/// Returns `(format id, confidence, classified-via-frontmatter)`.
fn classify_file(file: &PackageFile) -> Option<(String, f32, bool)> {
    let mut best: Option<(String, f32, bool)> = None;
    let mut consider = |format: &str, confidence: f32, via_frontmatter: bool| {
        let better = match &best {
            Some((_, best_confidence, _)) => confidence > *best_confidence,
            None => confidence > 0.0,
        };
        if better {
            best = Some((format.to_owned(), confidence, via_frontmatter));
        }
    };

    for platform in platforms() {
        for schema in &platform.schemas {
            if let Some((confidence, via_frontmatter)) = score_schema(file, schema) {
                consider(platform.id, confidence, via_frontmatter);
            }
        }
    }
    for schema in universal_schemas() {
        if let Some((confidence, via_frontmatter)) = score_schema(file, schema) {
            consider(UNIVERSAL, confidence, via_frontmatter);
        }
    }

    // last resort: the top-level directory (or root file name) alone
    if best.is_none() {
        match file.rel_path.as_str() {
            "CLAUDE.md" => return Some(("claude".to_owned(), PATH_ONLY_CONFIDENCE, false)),
            "AGENTS.md" => return Some((UNIVERSAL.to_owned(), PATH_ONLY_CONFIDENCE, false)),
            _ => {}
        }
        if let Some(first) = file.rel_path.components().next() {
            let first = first.as_str();
            for platform in platforms() {
                if first == platform.dir {
                    return Some((platform.id.to_owned(), PATH_ONLY_CONFIDENCE, false));
                }
            }
            if universal_markers()
                .iter()
                .any(|marker| marker.strip_suffix("/**") == Some(first))
            {
                return Some((UNIVERSAL.to_owned(), PATH_ONLY_CONFIDENCE, false));
            }
        }
    }
    best
}

/// Score one file against one schema
fn score_schema(file: &PackageFile, schema: &FileSchema) -> Option<(f32, bool)> {
    let path_matches = glob::Pattern::new(&schema.flow_glob)
        .map(|pattern| pattern.matches(file.rel_path.as_str()))
        .unwrap_or(false);

    let Some(frontmatter) = &file.frontmatter else {
        // no frontmatter to score; the flow glob alone is weak evidence
        return path_matches.then_some((PATH_ONLY_CONFIDENCE, false));
    };

    let possible: f32 = schema.fields.iter().map(|field| field.weight).sum();
    let mut matched = 0.0f32;
    let mut exclusive_matched = false;
    for field in &schema.fields {
        let Some(value) = frontmatter.get(field.name) else {
            continue;
        };
        if !kind_matches(field.kind, value) {
            continue;
        }
        matched += field.weight;
        exclusive_matched |= field.exclusive;
    }
    if matched == 0.0 {
        return path_matches.then_some((PATH_ONLY_CONFIDENCE, false));
    }

    let mut confidence = matched / possible;
    if path_matches {
        confidence += FLOW_GLOB_BOOST;
    }
    if exclusive_matched {
        confidence += EXCLUSIVE_BOOST;
    }
    Some((confidence.clamp(0.0, 1.0), true))
}

fn kind_matches(kind: FieldKind, value: &serde_json::Value) -> bool {
    match kind {
        FieldKind::Any => true,
        FieldKind::Text => value.is_string(),
        FieldKind::Array => value.is_array(),
        FieldKind::Object => value.is_object(),
        FieldKind::Bool => value.is_boolean(),
    }
}

fn format_from_id(id: &str) -> PackageFormat {
    if id == UNIVERSAL {
        return PackageFormat::Universal;
    }
    match platforms().iter().find(|platform| platform.id == id) {
        Some(platform) => PackageFormat::Platform(platform.id),
        None => PackageFormat::Unknown,
    }
}
