//! Builder state machine.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use super::sources::{SourceKind, dep_path, object_path};
use super::types::{BuildReport, Stage};
use super::BuildError;
use crate::arch::Arch;
use crate::detect::SnapshotTree;
use crate::directive;
use crate::events::{BuildContext, EventBus, Phase};
use crate::exec::CommandRunner;
use crate::layout::{ProjectLayout, files_with_extensions};
use crate::model::{Project, Target};
use crate::placeholder::{self, Variables};

/// Runs builds of one project.
///
/// Tool invocations go through `R`, and every path handed to a tool is
/// relative to the project root, so `R` must run programs from there.
pub struct Builder<R: CommandRunner> {
  layout: ProjectLayout,
  events: EventBus,
  runner: R,
  stage: Stage,
}

impl<R: CommandRunner> Builder<R> {
  pub fn new(layout: ProjectLayout, events: EventBus, runner: R) -> Self {
    Self {
      layout,
      events,
      runner,
      stage: Stage::Resolving,
    }
  }

  pub fn events_mut(&mut self) -> &mut EventBus {
    &mut self.events
  }

  pub fn runner(&self) -> &R {
    &self.runner
  }

  pub fn runner_mut(&mut self) -> &mut R {
    &mut self.runner
  }

  /// Stage reached by the most recent build.
  pub fn stage(&self) -> Stage {
    self.stage
  }

  /// Build `target_name` from `project`.
  pub fn build(&mut self, project: &Project, target_name: &str) -> Result<BuildReport, BuildError> {
    self.stage = Stage::Resolving;
    let result = self.run_stages(project, target_name);
    if let Err(e) = &result {
      debug!(stage = %self.stage, error = %e, "build failed");
      self.stage = Stage::Failed;
    }
    result
  }

  fn enter(&mut self, stage: Stage) {
    debug!(from = %self.stage, to = %stage, "stage");
    self.stage = stage;
  }

  fn run_stages(&mut self, project: &Project, target_name: &str) -> Result<BuildReport, BuildError> {
    let target = project
      .target(target_name)
      .ok_or_else(|| BuildError::UnknownTarget(target_name.to_string()))?;
    let arch = target.architecture;
    info!(target = %target.name, arch = %arch, "building");

    let mut vars = Variables::new();
    vars.insert("arch".to_string(), arch.to_string());
    let mut report = BuildReport::new(&target.name, arch);

    self.enter(Stage::PreBuild);
    if let Some(reason) = self.fire(Phase::PreBuild, target, project, &mut vars) {
      return Err(BuildError::Aborted { reason });
    }

    self.enter(Stage::Preparing);
    self.prepare(arch)?;

    self.enter(Stage::Compiling);
    self.compile(target, &mut vars, &mut report)?;

    self.enter(Stage::PreLink);
    self.fire(Phase::PreLink, target, project, &mut vars);

    self.enter(Stage::Linking);
    report.binary = self.link(target, &mut vars)?;

    self.enter(Stage::PostLink);
    self.fire(Phase::PostLink, target, project, &mut vars);

    self.enter(Stage::Snapshotting);
    self.snapshot(arch)?;

    self.enter(Stage::PostBuild);
    self.fire(Phase::PostBuild, target, project, &mut vars);

    self.enter(Stage::Done);
    info!(
      target = %target.name,
      compiled = report.compiled.len(),
      skipped = report.skipped.len(),
      up_to_date = report.up_to_date.len(),
      "build finished"
    );
    Ok(report)
  }

  /// Notify `phase` subscribers and return the abort reason if the phase
  /// honors aborts.
  fn fire(&mut self, phase: Phase, target: &Target, project: &Project, vars: &mut Variables) -> Option<String> {
    let mut ctx = BuildContext::new(target, project, vars);
    self.events.emit(phase, &mut ctx);

    let reason = ctx.abort_reason()?.to_string();
    if phase.can_abort() {
      Some(reason)
    } else {
      warn!(phase = %phase, reason = %reason, "abort requested after pre-build, ignoring");
      None
    }
  }

  fn prepare(&self, arch: Arch) -> Result<(), BuildError> {
    let source_dir = self.layout.source_dir();
    if !source_dir.is_dir() {
      return Err(BuildError::Io {
        path: source_dir,
        source: io::Error::new(io::ErrorKind::NotFound, "source directory not found"),
      });
    }

    let object_dir = self.layout.object_dir(arch);
    for dir in [
      object_dir.clone(),
      self.layout.output_dir(),
      self.layout.temp_dir(),
      self.layout.snapshot_dir(arch),
    ] {
      create_dir(&dir)?;
    }
    for dir in self.layout.source_subdirs()? {
      create_dir(&self.layout.rebase(&dir, &object_dir))?;
    }
    Ok(())
  }

  fn compile(&mut self, target: &Target, vars: &mut Variables, report: &mut BuildReport) -> Result<(), BuildError> {
    let arch = target.architecture;
    let object_dir = self.layout.object_dir(arch);
    let snapshot = SnapshotTree::new(self.layout.source_dir(), self.layout.snapshot_dir(arch));

    for path in self.layout.source_files()? {
      let Some(kind) = SourceKind::from_path(&path) else {
        continue;
      };
      let relative = self.relative(&path).to_path_buf();
      let Some(tool) = kind.tool() else {
        debug!(src = %relative.display(), "no compiler for this source kind");
        continue;
      };

      if !snapshot.needs_rebuild(&path).map_err(io_error(&path))? {
        debug!(src = %relative.display(), "up to date");
        report.up_to_date.push(relative);
        continue;
      }

      let eligible = directive::file_is_eligible(&path, kind.comment_prefix(), arch).map_err(io_error(&path))?;
      if !eligible {
        info!(src = %relative.display(), arch = %arch, "skipped by architecture directive");
        report.skipped.push(relative);
        continue;
      }

      let rebased = self.layout.rebase(&path, &object_dir);
      let object = object_path(&rebased, kind);
      vars.insert("src".to_string(), path_value(&relative));
      vars.insert("obj".to_string(), path_value(self.relative(&object)));
      if kind.emits_deps() {
        vars.insert("dep".to_string(), path_value(self.relative(&dep_path(&rebased))));
      } else {
        vars.remove("dep");
      }

      let args = tool_args(&target.flags(tool), vars);
      info!(tool = tool.tag(), src = %relative.display(), "compiling");
      self
        .runner
        .run(target.program(tool), &args)
        .map_err(|source| BuildError::Compile {
          source_file: relative.clone(),
          source,
        })?;
      report.compiled.push(relative);
    }
    Ok(())
  }

  fn link(&mut self, target: &Target, vars: &mut Variables) -> Result<PathBuf, BuildError> {
    let object_dir = self.layout.object_dir(target.architecture);
    let mut objects = files_with_extensions(&object_dir, &["o"])?;
    objects.sort();
    let objs: Vec<String> = objects
      .iter()
      .map(|o| shell_quote(&path_value(self.relative(o))))
      .collect();

    let binary = target.binary_path();
    let script = placeholder::substitute_arch(&target.ld_script, target.architecture);
    vars.insert("lds".to_string(), script);
    vars.insert("objs".to_string(), objs.join(" "));
    vars.insert("bin".to_string(), path_value(&binary));
    vars.insert("map".to_string(), path_value(&binary.with_extension("map")));

    if let Some(parent) = self.layout.root().join(&binary).parent() {
      create_dir(parent)?;
    }

    let args = tool_args(&target.link_flags(), vars);
    info!(objects = objects.len(), bin = %binary.display(), "linking");
    self
      .runner
      .run(&target.ld, &args)
      .map_err(|source| BuildError::Link { source })?;
    Ok(binary)
  }

  fn snapshot(&self, arch: Arch) -> Result<(), BuildError> {
    let snapshot = SnapshotTree::new(self.layout.source_dir(), self.layout.snapshot_dir(arch));
    let sources = self.layout.source_files()?;
    let copied = snapshot
      .refresh(sources.iter().map(PathBuf::as_path))
      .map_err(io_error(snapshot.snapshot_root()))?;
    debug!(files = copied, snapshot = %snapshot.snapshot_root().display(), "snapshot refreshed");
    Ok(())
  }

  fn relative<'p>(&self, path: &'p Path) -> &'p Path {
    path.strip_prefix(self.layout.root()).unwrap_or(path)
  }
}

/// Variables holding a single path. They are stored plain and quoted only
/// in the argument string handed to a tool.
const PATH_VARS: [&str; 6] = ["src", "obj", "dep", "lds", "bin", "map"];

fn path_value(path: &Path) -> String {
  path.to_string_lossy().into_owned()
}

/// Quote one argument; an empty value stays empty.
fn shell_quote(value: &str) -> String {
  if value.is_empty() {
    return String::new();
  }
  shell_words::quote(value).into_owned()
}

/// Substitute `template` with the path variables quoted for argument
/// splitting.
fn tool_args(template: &str, vars: &Variables) -> String {
  let mut quoted = vars.clone();
  for name in PATH_VARS {
    if let Some(value) = quoted.get_mut(name) {
      *value = shell_quote(value);
    }
  }
  placeholder::substitute(template, &quoted)
}

fn create_dir(path: &Path) -> Result<(), BuildError> {
  fs::create_dir_all(path).map_err(io_error(path))
}

fn io_error(path: &Path) -> impl FnOnce(io::Error) -> BuildError + '_ {
  move |source| BuildError::Io {
    path: path.to_path_buf(),
    source,
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::util::testutil::RecordingRunner;
  use std::cell::RefCell;
  use std::rc::Rc;
  use tempfile::TempDir;

  struct Fixture {
    temp: TempDir,
    project: Project,
  }

  impl Fixture {
    fn new(arch: &str) -> Self {
      let temp = TempDir::new().unwrap();
      let project: Project = serde_json::from_value(serde_json::json!({
        "name": "kernel",
        "targets": [{
          "name": "t1",
          "architecture": arch,
          "cc": "cc",
          "cc_flags": ["-c", "%src%", "-o", "%obj%", "-MD", "-MF", "%dep%"],
          "cxx": "c++",
          "cxx_flags": ["-c", "%src%", "-o", "%obj%"],
          "asm": "nasm",
          "asm_flags": ["-f", "elf64", "%src%", "-o", "%obj%"],
          "ld": "ld",
          "ld_flags": ["-T", "%lds%", "%objs%", "-o", "%bin%", "-Map", "%map%"],
          "ld_script": "link-%arch%.ld",
          "output_binary": "output/kernel-%arch%.elf"
        }]
      }))
      .unwrap();
      std::fs::create_dir_all(temp.path().join("src")).unwrap();
      Self { temp, project }
    }

    fn root(&self) -> &Path {
      self.temp.path()
    }

    fn write(&self, relative: &str, content: &str) {
      let path = self.root().join("src").join(relative);
      std::fs::create_dir_all(path.parent().unwrap()).unwrap();
      std::fs::write(path, content).unwrap();
    }

    fn builder(&self) -> Builder<RecordingRunner> {
      Builder::new(
        ProjectLayout::new(self.root()),
        EventBus::new(),
        RecordingRunner::in_dir(self.root()),
      )
    }
  }

  fn link_args(builder: &Builder<RecordingRunner>) -> Vec<String> {
    let links = builder.runner().calls_to("ld");
    assert_eq!(links.len(), 1);
    links[0].args.clone()
  }

  #[test]
  fn unknown_target_has_no_side_effects() {
    let fixture = Fixture::new("x86_64");
    let mut builder = fixture.builder();

    let err = builder.build(&fixture.project, "none").unwrap_err();

    assert!(matches!(err, BuildError::UnknownTarget(name) if name == "none"));
    assert_eq!(builder.stage(), Stage::Failed);
    assert!(builder.runner().calls.is_empty());
    assert!(!fixture.root().join("obj-x86_64").exists());
  }

  #[test]
  fn compiles_each_kind_and_links() {
    let fixture = Fixture::new("x86_64");
    fixture.write("main.c", "int main(void) { return 0; }\n");
    fixture.write("arch/gdt.cpp", "void gdt() {}\n");
    fixture.write("arch/boot.asm", "bits 64\n");
    fixture.write("lib.rs", "fn f() {}\n");
    let mut builder = fixture.builder();

    let report = builder.build(&fixture.project, "t1").unwrap();

    assert_eq!(builder.stage(), Stage::Done);
    assert_eq!(report.compiled.len(), 3);
    assert_eq!(report.binary, PathBuf::from("output/kernel-x86_64.elf"));

    let runner = builder.runner();
    assert_eq!(
      runner.calls_to("cc")[0].args,
      vec!["-c", "src/main.c", "-o", "obj-x86_64/main.o", "-MD", "-MF", "obj-x86_64/main.d"]
    );
    assert_eq!(runner.outputs_of("c++"), vec![PathBuf::from("obj-x86_64/arch/gdt.o")]);
    assert_eq!(runner.outputs_of("nasm"), vec![PathBuf::from("obj-x86_64/arch/boot-asm.o")]);

    assert_eq!(
      link_args(&builder),
      vec![
        "-T",
        "link-x86_64.ld",
        "obj-x86_64/arch/boot-asm.o",
        "obj-x86_64/arch/gdt.o",
        "obj-x86_64/main.o",
        "-o",
        "output/kernel-x86_64.elf",
        "-Map",
        "output/kernel-x86_64.map",
      ]
    );
    assert!(fixture.root().join("output/kernel-x86_64.elf").is_file());
  }

  #[test]
  fn second_build_relinks_without_compiling() {
    let fixture = Fixture::new("x86_64");
    fixture.write("a.c", "int a;\n");
    fixture.write("b.c", "int b;\n");
    let mut builder = fixture.builder();
    builder.build(&fixture.project, "t1").unwrap();
    builder.runner_mut().clear();

    let report = builder.build(&fixture.project, "t1").unwrap();

    assert!(builder.runner().calls_to("cc").is_empty());
    assert_eq!(builder.runner().calls_to("ld").len(), 1);
    assert!(report.compiled.is_empty());
    assert_eq!(report.up_to_date.len(), 2);
  }

  #[test]
  fn only_the_changed_file_is_recompiled() {
    let fixture = Fixture::new("x86_64");
    fixture.write("a.c", "int a;\n");
    fixture.write("b.c", "int b;\n");
    let mut builder = fixture.builder();
    builder.build(&fixture.project, "t1").unwrap();
    builder.runner_mut().clear();

    // Whitespace-only edits count as changes
    fixture.write("b.c", "int b; \n");
    let report = builder.build(&fixture.project, "t1").unwrap();

    assert_eq!(report.compiled, vec![PathBuf::from("src/b.c")]);
    assert_eq!(builder.runner().outputs_of("cc"), vec![PathBuf::from("obj-x86_64/b.o")]);
    let args = link_args(&builder);
    assert!(args.contains(&"obj-x86_64/a.o".to_string()));
    assert!(args.contains(&"obj-x86_64/b.o".to_string()));
  }

  #[test]
  fn directive_excludes_file_on_other_arch() {
    let fixture = Fixture::new("x86_64");
    fixture.write("a.c", "int a;\n");
    fixture.write("b.c", "// SKB_AARCH64_ONLY\nint b;\n");
    let mut builder = fixture.builder();

    let report = builder.build(&fixture.project, "t1").unwrap();

    assert_eq!(report.compiled, vec![PathBuf::from("src/a.c")]);
    assert_eq!(report.skipped, vec![PathBuf::from("src/b.c")]);
    let args = link_args(&builder);
    assert!(args.contains(&"obj-x86_64/a.o".to_string()));
    assert!(!args.iter().any(|a| a.ends_with("b.o")));
  }

  #[test]
  fn directive_admits_file_on_its_arch() {
    let fixture = Fixture::new("AArch64");
    fixture.write("a.c", "int a;\n");
    fixture.write("b.c", "// SKB_AARCH64_ONLY\nint b;\n");
    let mut builder = fixture.builder();

    let report = builder.build(&fixture.project, "t1").unwrap();

    assert_eq!(report.compiled.len(), 2);
    assert!(report.skipped.is_empty());
    let args = link_args(&builder);
    assert!(args.contains(&"obj-AArch64/a.o".to_string()));
    assert!(args.contains(&"obj-AArch64/b.o".to_string()));
  }

  #[test]
  fn pre_build_abort_stops_before_any_tool_runs() {
    let fixture = Fixture::new("x86_64");
    fixture.write("a.c", "int a;\n");
    let mut builder = fixture.builder();
    builder
      .events_mut()
      .subscribe(Phase::PreBuild, |ctx| ctx.abort("DevKitPro hasn't been installed"));

    let err = builder.build(&fixture.project, "t1").unwrap_err();

    assert!(matches!(&err, BuildError::Aborted { reason } if reason == "DevKitPro hasn't been installed"));
    assert_eq!(err.exit_code(), 1);
    assert!(builder.runner().calls.is_empty());
    assert!(!fixture.root().join("obj-x86_64").exists());
  }

  #[test]
  fn later_aborts_are_ignored() {
    let fixture = Fixture::new("x86_64");
    fixture.write("a.c", "int a;\n");
    let mut builder = fixture.builder();
    for phase in [Phase::PreLink, Phase::PostLink, Phase::PostBuild] {
      builder.events_mut().subscribe(phase, |ctx| ctx.abort("too late"));
    }

    assert!(builder.build(&fixture.project, "t1").is_ok());
    assert_eq!(builder.stage(), Stage::Done);
  }

  #[test]
  fn phases_fire_in_order_and_share_variables() {
    let fixture = Fixture::new("x86_64");
    fixture.write("a.c", "int a;\n");
    let mut project = fixture.project.clone();
    project.targets[0].cc_flags = vec!["%defines%".to_string(), "-c".to_string(), "%src%".to_string()];
    let mut builder = fixture.builder();

    let seen = Rc::new(RefCell::new(Vec::new()));
    for phase in Phase::ALL {
      let seen = Rc::clone(&seen);
      builder.events_mut().subscribe(phase, move |ctx| {
        seen.borrow_mut().push((phase, ctx.var("bin").map(str::to_string)));
      });
    }
    builder
      .events_mut()
      .subscribe(Phase::PreBuild, |ctx| ctx.set_var("defines", "-DSKC_ENABLEPCIC"));

    builder.build(&project, "t1").unwrap();

    let seen = seen.borrow();
    let phases: Vec<_> = seen.iter().map(|(p, _)| *p).collect();
    assert_eq!(phases, Phase::ALL.to_vec());
    assert_eq!(seen[0].1, None);
    assert_eq!(seen[2].1.as_deref(), Some("output/kernel-x86_64.elf"));
    assert_eq!(builder.runner().calls_to("cc")[0].args, vec!["-DSKC_ENABLEPCIC", "-c", "src/a.c"]);
  }

  #[test]
  fn compile_failure_stops_the_build() {
    let fixture = Fixture::new("x86_64");
    fixture.write("a.c", "int a;\n");
    let mut builder = Builder::new(
      ProjectLayout::new(fixture.root()),
      EventBus::new(),
      RecordingRunner::in_dir(fixture.root()).fail_on("cc"),
    );

    let err = builder.build(&fixture.project, "t1").unwrap_err();

    assert!(matches!(&err, BuildError::Compile { source_file, .. } if source_file == Path::new("src/a.c")));
    assert!(builder.runner().calls_to("ld").is_empty());
    assert!(!fixture.root().join(".skb/srctree-x86_64/a.c").exists());
  }

  #[test]
  fn link_failure_keeps_objects_and_skips_snapshot() {
    let fixture = Fixture::new("x86_64");
    fixture.write("a.c", "int a;\n");
    let mut builder = Builder::new(
      ProjectLayout::new(fixture.root()),
      EventBus::new(),
      RecordingRunner::in_dir(fixture.root()).fail_on("ld"),
    );

    let err = builder.build(&fixture.project, "t1").unwrap_err();

    assert!(matches!(err, BuildError::Link { .. }));
    assert!(fixture.root().join("obj-x86_64/a.o").is_file());
    assert!(!fixture.root().join(".skb/srctree-x86_64/a.c").exists());
  }

  #[test]
  fn snapshot_matches_sources_after_build() {
    let fixture = Fixture::new("x86_64");
    fixture.write("a.c", "int a;\n");
    fixture.write("mm/pmm.c", "int pmm;\n");
    fixture.write("start.s", ".text\n");
    let mut builder = fixture.builder();

    builder.build(&fixture.project, "t1").unwrap();

    let snapshot = fixture.root().join(".skb/srctree-x86_64");
    for file in ["a.c", "mm/pmm.c", "start.s"] {
      assert_eq!(
        std::fs::read(snapshot.join(file)).unwrap(),
        std::fs::read(fixture.root().join("src").join(file)).unwrap(),
        "{file}"
      );
    }
    assert!(fixture.root().join("obj-x86_64/mm").is_dir());
    assert!(builder.runner().calls_to("cc").iter().all(|c| !c.args.iter().any(|a| a.ends_with(".s"))));
  }

  #[test]
  fn missing_source_dir_is_an_io_error() {
    let fixture = Fixture::new("x86_64");
    std::fs::remove_dir(fixture.root().join("src")).unwrap();
    let mut builder = fixture.builder();

    let err = builder.build(&fixture.project, "t1").unwrap_err();

    assert!(matches!(err, BuildError::Io { .. }));
    assert!(builder.runner().calls.is_empty());
  }

  #[test]
  fn non_utf8_directive_line_still_compiles() {
    let fixture = Fixture::new("x86_64");
    std::fs::write(fixture.root().join("src/a.c"), b"// (c) Jos\xe9\nint a;\n").unwrap();
    let mut builder = fixture.builder();

    let report = builder.build(&fixture.project, "t1").unwrap();

    assert_eq!(report.compiled, vec![PathBuf::from("src/a.c")]);
    assert_eq!(link_args(&builder)[2], "obj-x86_64/a.o");
  }

  #[test]
  fn handlers_see_unquoted_paths() {
    let fixture = Fixture::new("x86_64");
    fixture.write("a.c", "int a;\n");
    let mut project = fixture.project.clone();
    project.targets[0].output_binary = "output/my app.elf".to_string();
    let mut builder = fixture.builder();

    let seen = Rc::new(RefCell::new(None));
    let bin = Rc::clone(&seen);
    builder.events_mut().subscribe(Phase::PostLink, move |ctx| {
      *bin.borrow_mut() = ctx.var("bin").map(str::to_string);
    });

    builder.build(&project, "t1").unwrap();

    assert_eq!(seen.borrow().as_deref(), Some("output/my app.elf"));
    let args = link_args(&builder);
    assert!(args.contains(&"output/my app.elf".to_string()));
    assert!(args.contains(&"output/my app.map".to_string()));
  }

  #[test]
  fn paths_with_spaces_survive_argument_splitting() {
    let fixture = Fixture::new("x86_64");
    fixture.write("my drivers/uart.c", "int uart;\n");
    let mut builder = fixture.builder();

    builder.build(&fixture.project, "t1").unwrap();

    assert_eq!(
      builder.runner().outputs_of("cc"),
      vec![PathBuf::from("obj-x86_64/my drivers/uart.o")]
    );
  }
}
