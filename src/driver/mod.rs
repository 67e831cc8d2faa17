//! Batch generation runs.
//!
//! Descriptors are parsed on scoped worker threads and sent to the coordinating thread, which
//! owns the registry and registers them in input order. Joining the loader scope is the
//! barrier: only then is the registry frozen and handed, read-only, to the link/emit workers.
//! Output is written last, in input order.

mod output;
mod report;
mod stage;


use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, mpsc};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::Instant;

use crate::descriptor::{DescriptorSource, InterfaceDescriptor, LoadOptions, load_interface};
use crate::diagnostics::{Entity, ErrorKind, ErrorSet, GenerationError};
use crate::emit::{EmitOptions, EmittedUnit, TargetLanguage, emit};
use crate::error::{Error, Result};
use crate::link::{LinkOptions, link};
use crate::registry::{ExternalType, Registrar, Registry};
use crate::types::PointerWidth;

pub use report::{InterfaceReport, RunReport, WriteOutcome};
pub use stage::{Stage, StageTracker};

/// One descriptor to load.
#[derive(Clone, Debug)]
pub enum Input {
    File(PathBuf),
    Inline(DescriptorSource),
}

impl Input {
    #[must_use]
    pub fn label(&self) -> String {
        match self {
            Input::File(path) => path.display().to_string(),
            Input::Inline(source) => source.label.clone(),
        }
    }

    fn read(&self) -> io::Result<DescriptorSource> {
        match self {
            Input::File(path) => DescriptorSource::from_path(path),
            Input::Inline(source) => Ok(source.clone()),
        }
    }
}

impl From<PathBuf> for Input {
    fn from(path: PathBuf) -> Self {
        Input::File(path)
    }
}

impl From<&Path> for Input {
    fn from(path: &Path) -> Self {
        Input::File(path.to_path_buf())
    }
}

impl From<DescriptorSource> for Input {
    fn from(source: DescriptorSource) -> Self {
        Input::Inline(source)
    }
}

#[derive(Clone, Debug, Default)]
pub struct GenerateOptions {
    pub language: TargetLanguage,
    pub pointer_width: PointerWidth,
    /// Worker threads per parallel phase; `0` uses the available parallelism.
    pub jobs: usize,
    pub default_library: Option<String>,
    /// Types declared outside every descriptor (manifest `types`).
    pub external_types: Vec<ExternalType>,
    /// Directory receiving the units; `None` runs every stage without writing.
    pub output: Option<PathBuf>,
}

/// Report plus the emitted units of the interfaces that reached `Done`, in input order.
#[derive(Clone, Debug)]
pub struct Generation {
    pub report: RunReport,
    pub units: Vec<EmittedUnit>,
}

struct Slot {
    source: String,
    name: Option<String>,
    tracker: StageTracker,
    errors: Vec<GenerationError>,
    descriptor: Option<Arc<InterfaceDescriptor>>,
    unit: Option<EmittedUnit>,
    file: Option<PathBuf>,
    write: Option<WriteOutcome>,
}

impl Slot {
    fn new(source: String) -> Self {
        Self {
            source,
            name: None,
            tracker: StageTracker::default(),
            errors: Vec::new(),
            descriptor: None,
            unit: None,
            file: None,
            write: None,
        }
    }

    fn fail(&mut self, errors: ErrorSet) {
        tracing::warn!(
            target: "pipeline",
            stage = self.tracker.stage().as_str(),
            interface = %self.name.as_deref().unwrap_or(&self.source),
            errors = errors.len(),
            "interface failed"
        );
        self.errors.extend(errors.into_vec());
        self.tracker.fail();
    }

    fn into_report(self) -> (InterfaceReport, Option<EmittedUnit>) {
        let report = InterfaceReport {
            source: self.source,
            name: self.name,
            stage: self.tracker.stage(),
            file: self.file,
            fingerprint: self.unit.as_ref().map(|unit| unit.fingerprint.clone()),
            write: self.write,
            errors: self.errors,
        };
        let unit = self.unit.filter(|_| report.succeeded());
        (report, unit)
    }
}

enum Processed {
    LinkFailed(ErrorSet),
    EmitFailed(ErrorSet),
    Emitted(EmittedUnit),
}

fn worker_count(requested: usize, work: usize) -> usize {
    let jobs = if requested == 0 {
        thread::available_parallelism().map_or(1, |count| count.get())
    } else {
        requested
    };
    jobs.min(work).max(1)
}

/// Run every stage for `inputs`.
///
/// Interface failures are recorded in the report and never abort siblings; successful
/// interfaces are still emitted and written.
///
/// # Errors
/// Returns internal errors for conflicting external types or a panicked worker. Failing to
/// write one unit fails only that interface.
pub fn generate(inputs: &[Input], options: &GenerateOptions) -> Result<Generation> {
    let started = Instant::now();
    let jobs = worker_count(options.jobs, inputs.len());
    let mut run = StageTracker::default();
    tracing::info!(
        target: "pipeline",
        stage = "run.start",
        inputs = inputs.len(),
        jobs,
        language = options.language.as_str(),
        pointer_width = options.pointer_width.bits(),
        output = %options.output.as_deref().map_or_else(|| "<check>".into(), |dir| dir.display().to_string())
    );

    let base = Registry::with_external_types(&options.external_types).map_err(|errors| {
        let messages: Vec<String> = errors.iter().map(ToString::to_string).collect();
        Error::internal(format!("invalid external types: {}", messages.join("; ")))
    })?;
    let mut registrar = Registrar::new(base);
    let mut slots = load_all(inputs, options, &mut registrar, jobs)?;

    // Every loader has joined; the registry is read-only from here on.
    let registry = registrar.into_inner();
    run.advance(Stage::Linking)?;
    for slot in slots.iter_mut().filter(|slot| slot.descriptor.is_some()) {
        slot.tracker.advance(Stage::Linking)?;
    }

    let processed = link_and_emit_all(&slots, &registry, options, jobs)?;
    for (index, outcome) in processed {
        let slot = &mut slots[index];
        match outcome {
            Processed::LinkFailed(errors) => slot.fail(errors),
            Processed::EmitFailed(errors) => {
                slot.tracker.advance(Stage::Emitting)?;
                slot.fail(errors);
            }
            Processed::Emitted(unit) => {
                slot.tracker.advance(Stage::Emitting)?;
                slot.unit = Some(unit);
            }
        }
    }
    run.advance(Stage::Emitting)?;

    claim_file_names(&mut slots);
    write_all(&mut slots, options.output.as_deref())?;

    let failed = slots
        .iter()
        .filter(|slot| slot.tracker.stage() != Stage::Done)
        .count();
    if failed == 0 {
        run.advance(Stage::Done)?;
    } else {
        run.fail();
    }
    tracing::info!(
        target: "pipeline",
        stage = "run.finish",
        result = run.stage().as_str(),
        total = slots.len(),
        failed,
        elapsed_ms = started.elapsed().as_millis() as u64
    );

    let mut interfaces = Vec::with_capacity(slots.len());
    let mut units = Vec::new();
    for slot in slots {
        let (report, unit) = slot.into_report();
        interfaces.push(report);
        units.extend(unit);
    }
    Ok(Generation {
        report: RunReport {
            stage: run.stage(),
            language: options.language,
            output: options.output.clone(),
            interfaces,
        },
        units,
    })
}

fn load_all(
    inputs: &[Input],
    options: &GenerateOptions,
    registrar: &mut Registrar,
    jobs: usize,
) -> Result<Vec<Slot>> {
    let load_options = LoadOptions {
        default_library: options.default_library.clone(),
    };
    let next = AtomicUsize::new(0);
    let (next, load_options) = (&next, &load_options);
    let mut slots: Vec<Option<Slot>> = inputs.iter().map(|_| None).collect();

    thread::scope(|scope| {
        let (tx, rx) = mpsc::channel();
        let workers: Vec<_> = (0..jobs)
            .map(|_| {
                let tx = tx.clone();
                scope.spawn(move || {
                    loop {
                        let index = next.fetch_add(1, Ordering::Relaxed);
                        let Some(input) = inputs.get(index) else {
                            break;
                        };
                        let (slot, descriptor) = load_one(input, load_options);
                        if tx.send((index, slot, descriptor)).is_err() {
                            break;
                        }
                    }
                })
            })
            .collect();
        drop(tx);

        // This thread is the only registry writer.
        for (index, slot, descriptor) in rx {
            slots[index] = Some(slot);
            for (ordinal, registration) in registrar.submit(index, descriptor) {
                let Some(slot) = slots[ordinal].as_mut() else {
                    continue;
                };
                match registration {
                    Ok(descriptor) => slot.descriptor = Some(descriptor),
                    Err(errors) => slot.fail(errors),
                }
            }
        }
        for worker in workers {
            worker
                .join()
                .map_err(|_| Error::internal("descriptor loader thread panicked"))?;
        }
        Ok::<_, Error>(())
    })?;

    if registrar.pending() > 0 {
        return Err(Error::internal("descriptor loader stopped before every input was registered"));
    }
    slots
        .into_iter()
        .map(|slot| slot.ok_or_else(|| Error::internal("descriptor loader skipped an input")))
        .collect()
}

/// Read and parse one input; registration happens on the coordinating thread.
fn load_one(input: &Input, options: &LoadOptions) -> (Slot, Option<InterfaceDescriptor>) {
    let mut slot = Slot::new(input.label());
    let source = match input.read() {
        Ok(source) => source,
        Err(err) => {
            slot.fail(ErrorSet::from(GenerationError::new(
                ErrorKind::MalformedDescriptor,
                slot.source.clone(),
                Entity::Interface,
                format!("cannot read descriptor: {err}"),
            )));
            return (slot, None);
        }
    };
    match load_interface(&source, options) {
        Ok(descriptor) => {
            slot.name = Some(descriptor.name.clone());
            (slot, Some(descriptor))
        }
        Err(errors) => {
            slot.fail(errors);
            (slot, None)
        }
    }
}

fn link_and_emit_all(
    slots: &[Slot],
    registry: &Registry,
    options: &GenerateOptions,
    jobs: usize,
) -> Result<Vec<(usize, Processed)>> {
    let work: Vec<(usize, &InterfaceDescriptor)> = slots
        .iter()
        .enumerate()
        .filter_map(|(index, slot)| slot.descriptor.as_deref().map(|descriptor| (index, descriptor)))
        .collect();
    let link_options = LinkOptions {
        pointer_width: options.pointer_width,
    };
    let emit_options = EmitOptions {
        language: options.language,
    };
    let next = AtomicUsize::new(0);
    let (next, work) = (&next, &work);

    let mut processed = thread::scope(|scope| {
        let workers: Vec<_> = (0..jobs.min(work.len()).max(1))
            .map(|_| {
                scope.spawn(move || {
                    let mut done = Vec::new();
                    loop {
                        let position = next.fetch_add(1, Ordering::Relaxed);
                        let Some((index, descriptor)) = work.get(position) else {
                            break;
                        };
                        let outcome = match link(descriptor, registry, &link_options) {
                            Err(errors) => Processed::LinkFailed(errors),
                            Ok(linked) => match emit(&linked, &emit_options) {
                                Ok(unit) => Processed::Emitted(unit),
                                Err(errors) => Processed::EmitFailed(errors),
                            },
                        };
                        done.push((*index, outcome));
                    }
                    done
                })
            })
            .collect();
        let mut processed = Vec::with_capacity(work.len());
        for worker in workers {
            let batch = worker
                .join()
                .map_err(|_| Error::internal("link/emit worker thread panicked"))?;
            processed.extend(batch);
        }
        Ok::<_, Error>(processed)
    })?;

    processed.sort_by_key(|(index, _)| *index);
    Ok(processed)
}

/// Two interfaces rendering to the same file: the earlier input keeps it.
fn claim_file_names(slots: &mut [Slot]) {
    let mut claimed: HashMap<String, String> = HashMap::new();
    for slot in slots.iter_mut() {
        let Some(unit) = &slot.unit else {
            continue;
        };
        if let Some(owner) = claimed.get(&unit.file_name) {
            let error = GenerationError::new(
                ErrorKind::DuplicateName,
                unit.interface.clone(),
                Entity::Interface,
                format!("output file `{}` is already generated by `{owner}`", unit.file_name),
            );
            slot.unit = None;
            slot.fail(ErrorSet::from(error));
            continue;
        }
        claimed.insert(unit.file_name.clone(), unit.interface.clone());
    }
}

fn write_all(slots: &mut [Slot], output: Option<&Path>) -> Result<()> {
    for slot in slots.iter_mut() {
        let Some(unit) = &slot.unit else {
            continue;
        };
        let written = match output {
            Some(dir) => output::write_unit(dir, &unit.file_name, &unit.text),
            None => Ok((PathBuf::from(&unit.file_name), WriteOutcome::Skipped)),
        };
        let (file, outcome) = match written {
            Ok(written) => written,
            Err(err) => {
                let target = output.map_or_else(
                    || PathBuf::from(&unit.file_name),
                    |dir| dir.join(&unit.file_name),
                );
                let error = GenerationError::new(
                    ErrorKind::WriteFailed,
                    unit.interface.clone(),
                    Entity::Interface,
                    format!("cannot write `{}`: {err}", target.display()),
                );
                slot.file = Some(target);
                slot.unit = None;
                slot.fail(ErrorSet::from(error));
                continue;
            }
        };
        tracing::debug!(
            target: "pipeline",
            stage = "write",
            interface = %unit.interface,
            file = %file.display(),
            outcome = ?outcome
        );
        slot.file = Some(file);
        slot.write = Some(outcome);
        slot.tracker.advance(Stage::Done)?;
    }
    Ok(())
}
