//! The wave installer
//!
//! Executes install contexts wave by wave: within a wave, packages install
//! under bounded parallelism (BFS guarantees no intra-wave dependency);
//! between waves the engine joins, flushes the queued index mutations as
//! one atomic write, and flushes each task's buffered output in install
//! order so user-visible logs are deterministic.

pub mod collector;
pub mod output;

use std::sync::Arc;

use camino::{Utf8Path, Utf8PathBuf};
use openpackage_project::platforms::UNIVERSAL;
use openpackage_schema::{IndexFile, InstallReceipt, PackageReport, ReportStatus};
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

pub use collector::IndexWriteCollector;
pub use output::{BufferedOutput, OutputPort, TracingOutput};

use crate::context::{build_contexts, InstallContext};
use crate::errors::OpResult;
use crate::index::{read_index, write_index, WorkspaceIndex};
use crate::resolver::graph::WaveResult;
use crate::strategy::{index_record_for, run_strategy, source_path_string, StrategyOutcome};

/// Default bounded parallelism within a wave
pub const DEFAULT_CONCURRENCY: usize = 4;

/// Knobs for one install run
#[derive(Debug, Clone)]
pub struct InstallOptions {
    /// Target platform ids (`universal`, `claude`, ...); every package
    /// installs onto each
    pub platforms: Vec<String>,
    /// Overwrite files other packages own, reinstall what's current
    pub force: bool,
    /// Stop enqueueing waves after one with a failure (the in-flight wave
    /// drains)
    pub fail_fast: bool,
    /// Bounded parallelism within a wave
    pub concurrency: usize,
    /// Prepend package short names to installed filenames
    pub with_prefix: bool,
    /// Separator between prefix and filename
    pub prefix_separator: String,
}

impl Default for InstallOptions {
    fn default() -> Self {
        InstallOptions {
            platforms: vec![UNIVERSAL.to_owned()],
            force: false,
            fail_fast: false,
            concurrency: DEFAULT_CONCURRENCY,
            with_prefix: false,
            prefix_separator: "-".to_owned(),
        }
    }
}

/// The wave-parallel install engine
pub struct WaveInstaller<'a> {
    workspace: Utf8PathBuf,
    options: InstallOptions,
    real_output: &'a dyn OutputPort,
}

/// What one task sends back across the join
struct TaskResult {
    position: usize,
    context: InstallContext,
    outcome: StrategyOutcome,
    lines: Vec<String>,
}

impl<'a> WaveInstaller<'a> {
    /// Build an installer for one workspace
    pub fn new(
        workspace: &Utf8Path,
        options: InstallOptions,
        real_output: &'a dyn OutputPort,
    ) -> Self {
        WaveInstaller {
            workspace: workspace.to_owned(),
            options,
            real_output,
        }
    }

    /// Install a resolved graph
    pub async fn install(&self, result: &WaveResult) -> OpResult<InstallReceipt> {
        let mut workspace_index = read_index(&self.workspace)?;
        let mut receipt = InstallReceipt {
            warnings: result.graph.warnings.clone(),
            ..Default::default()
        };
        receipt.warnings.extend(workspace_index.warnings.clone());

        let contexts: Vec<InstallContext> = build_contexts(result, &self.workspace, &self.options)
            .into_iter()
            .filter(|context| !context.is_root)
            .collect();
        let collector = Arc::new(IndexWriteCollector::new());

        let mut stop_after_wave = false;
        for wave_contexts in group_by_wave(&contexts) {
            if stop_after_wave {
                break;
            }
            let mut installable: Vec<InstallContext> = Vec::new();
            for context in wave_contexts {
                match self.skip_reason(context, &workspace_index.index) {
                    Some(reason) => {
                        debug!("skipping {}: {reason}", context.package_name);
                        self.real_output
                            .line(&format!("- {} skipped ({reason})", context.package_name));
                        let mut report = PackageReport::new(&context.package_name);
                        report.version =
                            context.resolved_version.as_ref().map(|v| v.to_string());
                        report.status = ReportStatus::Skipped;
                        receipt.skipped += 1;
                        receipt.results.push(report);
                    }
                    None => installable.push(context.clone()),
                }
            }
            if installable.is_empty() {
                continue;
            }

            let parallel = installable.len() > 1 && self.options.concurrency > 1;
            let mut task_results = if parallel {
                self.run_wave_parallel(&installable, &workspace_index.index, &collector)
                    .await
            } else {
                self.run_wave_sequential(&installable, &workspace_index.index, &collector)
            };
            task_results.sort_by_key(|task| task.position);

            // ordered flush of the buffered output
            for task in &task_results {
                for line in &task.lines {
                    self.real_output.line(line);
                }
            }

            let mut wave_failed = false;
            for task in task_results {
                let mut report = PackageReport::new(&task.context.package_name);
                report.version = task
                    .context
                    .resolved_version
                    .as_ref()
                    .map(|v| v.to_string());
                report.files_processed = task.outcome.files_processed;
                report.files_written = task.outcome.files_written;
                report.file_mapping = task.outcome.file_mapping.clone();
                report.conflicts = task.outcome.conflicts.clone();
                report.warnings = task.outcome.warnings.clone();
                report.errors = task.outcome.errors.clone();
                if task.outcome.success {
                    report.status = ReportStatus::Installed;
                    receipt.installed += 1;
                    collector.record(
                        task.context.package_name.clone(),
                        index_record_for(&task.context, &task.outcome),
                    );
                } else {
                    report.status = ReportStatus::Failed;
                    receipt.failed += 1;
                    wave_failed = true;
                }
                receipt.results.push(report);
            }

            // one atomic index write per wave, iff something queued
            if !collector.is_empty() {
                let mutations = collector.take();
                for (name, record) in mutations {
                    workspace_index.index.packages.insert(name, record);
                }
                write_index(&workspace_index)?;
            }

            if wave_failed && self.options.fail_fast {
                warn!("a package failed and fail-fast is set; not starting further waves");
                receipt
                    .warnings
                    .push("fail-fast: later waves were not started".to_owned());
                stop_after_wave = true;
            }
        }

        self.finalize_index(&mut workspace_index, result, &mut receipt);
        info!(
            "install finished: {} installed, {} failed, {} skipped",
            receipt.installed, receipt.failed, receipt.skipped
        );
        Ok(receipt)
    }

    /// Why a context shouldn't run, if any reason applies
    fn skip_reason(&self, context: &InstallContext, index: &IndexFile) -> Option<String> {
        if context.is_marketplace {
            return Some("marketplace".to_owned());
        }
        if context.missing {
            return Some("missing".to_owned());
        }
        if context.content_root.is_none() {
            return Some("no content root".to_owned());
        }
        if !self.options.force {
            if let Some(record) = index.packages.get(&context.package_name) {
                let same_version = record.version
                    == context.resolved_version.as_ref().map(|v| v.to_string());
                let same_source = record.path == source_path_string(&context.source);
                if same_version && same_source {
                    return Some("already installed".to_owned());
                }
            }
        }
        None
    }

    /// Run one wave's tasks under the concurrency bound
    async fn run_wave_parallel(
        &self,
        installable: &[InstallContext],
        committed: &IndexFile,
        collector: &Arc<IndexWriteCollector>,
    ) -> Vec<TaskResult> {
        let semaphore = Arc::new(Semaphore::new(self.options.concurrency));
        let mut joins = Vec::new();
        for (position, context) in installable.iter().enumerate() {
            let semaphore = Arc::clone(&semaphore);
            let collector = Arc::clone(collector);
            let committed = committed.clone();
            let context = context.clone();
            let options = self.options.clone();
            joins.push(tokio::spawn(async move {
                let _permit = semaphore.acquire_owned().await.expect("semaphore closed");
                tokio::task::spawn_blocking(move || {
                    run_task(position, context, committed, &collector, &options)
                })
                .await
                .expect("install task panicked")
            }));
        }
        let mut results = Vec::new();
        for join in joins {
            results.push(join.await.expect("install task aborted"));
        }
        results
    }

    /// Run one wave's tasks one after another
    fn run_wave_sequential(
        &self,
        installable: &[InstallContext],
        committed: &IndexFile,
        collector: &Arc<IndexWriteCollector>,
    ) -> Vec<TaskResult> {
        installable
            .iter()
            .enumerate()
            .map(|(position, context)| {
                run_task(
                    position,
                    context.clone(),
                    committed.clone(),
                    collector,
                    &self.options,
                )
            })
            .collect()
    }

    /// Best-effort final index touch-up: resolved versions and child edges
    fn finalize_index(
        &self,
        workspace_index: &mut WorkspaceIndex,
        result: &WaveResult,
        receipt: &mut InstallReceipt,
    ) {
        let mut changed = false;
        for node in result.graph.nodes.values() {
            let Some(record) = workspace_index.index.packages.get_mut(&node.display_name)
            else {
                continue;
            };
            let version = node.resolved_version.as_ref().map(|v| v.to_string());
            let dependencies: Vec<String> = node
                .children
                .iter()
                .filter_map(|child| result.graph.node(child))
                .map(|child| child.display_name.clone())
                .collect();
            if record.version != version || record.dependencies != dependencies {
                record.version = version;
                record.dependencies = dependencies;
                changed = true;
            }
        }
        if changed {
            if let Err(details) = write_index(workspace_index) {
                warn!("couldn't update the workspace index: {details}");
                receipt
                    .warnings
                    .push(format!("couldn't update the workspace index: {details}"));
            }
        }
    }
}

/// One package's install task: build its own ownership context, run the
/// strategy per target platform, buffer all output
fn run_task(
    position: usize,
    context: InstallContext,
    committed: IndexFile,
    collector: &IndexWriteCollector,
    options: &InstallOptions,
) -> TaskResult {
    use crate::ownership::OwnershipContext;

    let buffer = BufferedOutput::new();
    buffer.line(&format!(
        "installing {}{}",
        context.package_name,
        context
            .resolved_version
            .as_ref()
            .map(|v| format!("@{v}"))
            .unwrap_or_default()
    ));
    // per-package context, never shared: a shared one would misclassify a
    // reinstall's own files as alien
    let ownership = OwnershipContext::build(
        &context.package_name,
        &committed,
        &collector.pending(),
    );

    let mut combined: Option<StrategyOutcome> = None;
    for platform in &options.platforms {
        let outcome = match run_strategy(
            &context,
            platform,
            options.with_prefix,
            &options.prefix_separator,
            options.force,
            &ownership,
            &buffer,
        ) {
            Ok(outcome) => outcome,
            Err(details) => StrategyOutcome {
                success: false,
                errors: vec![details.to_string()],
                ..Default::default()
            },
        };
        match &mut combined {
            Some(existing) => existing.absorb(outcome),
            None => combined = Some(outcome),
        }
    }
    let outcome = combined.unwrap_or_else(|| StrategyOutcome {
        success: true,
        warnings: vec!["no target platforms configured; nothing to do".to_owned()],
        ..Default::default()
    });
    TaskResult {
        position,
        context,
        outcome,
        lines: buffer.drain(),
    }
}

/// Group contexts into runs of equal wave (install order is already
/// leaves-first, so the runs are the install sequence)
fn group_by_wave(contexts: &[InstallContext]) -> Vec<&[InstallContext]> {
    let mut groups = Vec::new();
    let mut start = 0;
    for index in 1..=contexts.len() {
        if index == contexts.len() || contexts[index].wave != contexts[start].wave {
            groups.push(&contexts[start..index]);
            start = index;
        }
    }
    groups
}
