//! Turning command-line inputs into descriptor batches.
//!
//! - `*.json`: a descriptor set as written by `buf build -o <file>.json`.
//! - a directory: the `.proto` files under it, built with `buf build` inside
//!   their module (nearest `buf.yaml` or `buf.work.yaml`, else the directory).
//! - `.proto` files: all of them together as one batch, each built inside its
//!   module with `buf build --path`.
//!
//! Every build is read twice: once with imports, so option types declared in
//! imported files resolve, and once with `--exclude-imports`, which names the
//! files the input itself declares. Only those are loaded.

use anyhow::{anyhow, bail, Context, Result};
use pbql_descriptor::{read_descriptor_set_json, FileDescriptor};
use serde_json::Value as Json;
use std::collections::{BTreeMap, HashSet};
use std::ffi::{OsStr, OsString};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;
use walkdir::WalkDir;

const MODULE_MARKERS: &[&str] = &["buf.yaml", "buf.work.yaml"];

/// How `.proto` sources are compiled.
#[derive(Debug, Clone)]
pub struct InputOptions {
    /// `buf` executable.
    pub buf: PathBuf,
    /// Extra import roots, searched after the module itself.
    pub import_paths: Vec<PathBuf>,
    /// On a failed build, build each file alone and keep what compiles.
    pub lenient: bool,
}

impl Default for InputOptions {
    fn default() -> Self {
        Self {
            buf: PathBuf::from("buf"),
            import_paths: Vec::new(),
            lenient: false,
        }
    }
}

/// Descriptors read for one input.
#[derive(Debug, Default)]
pub struct Batch {
    pub label: String,
    /// Everything read, imports included.
    pub files: Vec<FileDescriptor>,
    /// Files the input declares; `None` when every file counts.
    pub targets: Option<HashSet<String>>,
    /// Build failures skipped in lenient mode.
    pub errors: Vec<String>,
}

impl Batch {
    /// Split into files to load and files that only resolve names.
    ///
    /// A file already in `loaded` is never loaded twice.
    pub fn split(self, loaded: &HashSet<String>) -> (Vec<FileDescriptor>, Vec<FileDescriptor>) {
        let targets = self.targets;
        self.files.into_iter().partition(|file| {
            !loaded.contains(&file.path)
                && targets.as_ref().map_or(true, |t| t.contains(&file.path))
        })
    }
}

/// Read every input, one batch per descriptor set or directory and one for
/// all `.proto` files.
pub fn collect_batches(inputs: &[PathBuf], options: &InputOptions) -> Result<Vec<Batch>> {
    let mut batches = Vec::new();
    let mut proto_files = Vec::new();

    for input in inputs {
        if input.is_dir() {
            batches.push(read_directory(input, options)?);
            continue;
        }
        if !input.exists() {
            bail!("input {} does not exist", input.display());
        }
        match input.extension().and_then(OsStr::to_str) {
            Some("json") => batches.push(Batch {
                label: input.display().to_string(),
                files: read_descriptor_file(input)?,
                ..Default::default()
            }),
            Some("proto") => proto_files.push(input.clone()),
            _ => bail!(
                "unsupported input {} (expected a descriptor set `.json`, \
                 a `.proto` file or a directory)",
                input.display()
            ),
        }
    }

    if !proto_files.is_empty() {
        batches.push(read_proto_files(&proto_files, options)?);
    }
    Ok(batches)
}

pub fn read_descriptor_file(path: &Path) -> Result<Vec<FileDescriptor>> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let files = read_descriptor_set_json(&text)
        .with_context(|| format!("invalid descriptor set {}", path.display()))?;
    tracing::info!(path = %path.display(), files = files.len(), "read descriptor set");
    Ok(files)
}

fn read_directory(dir: &Path, options: &InputOptions) -> Result<Batch> {
    let label = dir.display().to_string();
    let dir = canonical(dir)?;
    let protos = proto_files_under(&dir);
    if protos.is_empty() {
        tracing::warn!(dir = %label, "no .proto files, nothing to load");
        return Ok(Batch {
            label,
            targets: Some(HashSet::new()),
            ..Default::default()
        });
    }

    let root = module_root(&dir);
    let paths = if root == dir { Vec::new() } else { vec![dir] };
    let build = Build { root, paths };

    let mut batch = Batch {
        label,
        targets: Some(HashSet::new()),
        ..Default::default()
    };
    build.run_into(&mut batch, &protos, options)?;
    Ok(batch)
}

fn read_proto_files(files: &[PathBuf], options: &InputOptions) -> Result<Batch> {
    let mut by_root: BTreeMap<PathBuf, Vec<PathBuf>> = BTreeMap::new();
    for file in files {
        let file = canonical(file)?;
        by_root.entry(module_root(&file)).or_default().push(file);
    }

    let mut batch = Batch {
        label: format!("{} .proto file(s)", files.len()),
        targets: Some(HashSet::new()),
        ..Default::default()
    };
    for (root, paths) in by_root {
        let build = Build {
            root,
            paths: paths.clone(),
        };
        build.run_into(&mut batch, &paths, options)?;
    }
    Ok(batch)
}

fn canonical(path: &Path) -> Result<PathBuf> {
    fs::canonicalize(path).with_context(|| format!("failed to resolve {}", path.display()))
}

fn proto_files_under(root: &Path) -> Vec<PathBuf> {
    WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .filter(|entry| entry.path().extension() == Some(OsStr::new("proto")))
        .map(|entry| entry.into_path())
        .collect()
}

fn module_root(path: &Path) -> PathBuf {
    let dir = if path.is_dir() {
        path
    } else {
        path.parent().unwrap_or_else(|| Path::new("."))
    };
    dir.ancestors()
        .find(|d| MODULE_MARKERS.iter().any(|m| d.join(m).is_file()))
        .unwrap_or(dir)
        .to_path_buf()
}

// =============================================================================
// buf
// =============================================================================

/// One `buf build` over `root`, limited to `paths` (all of `root` if empty).
struct Build {
    root: PathBuf,
    paths: Vec<PathBuf>,
}

impl Build {
    /// Build into `batch`. In lenient mode a failed build is retried one
    /// file of `protos` at a time.
    fn run_into(
        &self,
        batch: &mut Batch,
        protos: &[PathBuf],
        options: &InputOptions,
    ) -> Result<()> {
        let err = match self.read(options) {
            Ok((files, targets)) => {
                merge(batch, files, targets);
                return Ok(());
            }
            Err(e) if options.lenient => e,
            Err(e) => return Err(e),
        };

        tracing::warn!(
            root = %self.root.display(),
            error = %err,
            "build failed, retrying file by file"
        );
        for proto in protos {
            let single = Build {
                root: self.root.clone(),
                paths: vec![proto.clone()],
            };
            match single.read(options) {
                Ok((files, targets)) => merge(batch, files, targets),
                Err(e) => batch.errors.push(format!("{}: {e:#}", proto.display())),
            }
        }
        Ok(())
    }

    fn read(&self, options: &InputOptions) -> Result<(Vec<FileDescriptor>, HashSet<String>)> {
        let mut paths = self
            .paths
            .iter()
            .map(|p| p.strip_prefix(&self.root).map(Path::to_path_buf))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|_| anyhow!("input outside module {}", self.root.display()))?;

        // With import roots the module is compiled inside a generated
        // workspace; it has to stay alive until both builds ran.
        let workspace;
        let input = if options.import_paths.is_empty() {
            self.root.clone()
        } else {
            workspace = import_workspace(&self.root, &options.import_paths)?;
            let module = PathBuf::from("m0");
            paths = if paths.is_empty() {
                vec![module]
            } else {
                paths.iter().map(|rel| module.join(rel)).collect()
            };
            workspace.path().to_path_buf()
        };

        let image = run_buf(&options.buf, &input, &paths, false)?;
        let targets = run_buf(&options.buf, &input, &paths, true)?;
        let files = read_descriptor_set_json(&image).context("invalid descriptor set from buf")?;
        let targets = file_names(&targets)?;
        tracing::info!(
            root = %self.root.display(),
            files = files.len(),
            targets = targets.len(),
            "built descriptor set"
        );
        Ok((files, targets))
    }
}

fn merge(batch: &mut Batch, files: Vec<FileDescriptor>, targets: HashSet<String>) {
    let mut seen: HashSet<String> = batch.files.iter().map(|f| f.path.clone()).collect();
    for file in files {
        if seen.insert(file.path.clone()) {
            batch.files.push(file);
        }
    }
    batch.targets.get_or_insert_with(HashSet::new).extend(targets);
}

/// Run `buf build` from inside `input` and return the descriptor set JSON it
/// wrote. `paths` are relative to `input`.
fn run_buf(buf: &Path, input: &Path, paths: &[PathBuf], exclude_imports: bool) -> Result<String> {
    let out = tempfile::Builder::new()
        .prefix("pbql-")
        .suffix(".json")
        .tempfile()
        .context("failed to create a temporary descriptor file")?;

    let mut cmd = Command::new(buf);
    cmd.current_dir(input)
        .args(buf_args(paths, exclude_imports, out.path()));

    let output = cmd
        .output()
        .with_context(|| format!("failed to run `{} build` (is it on PATH?)", buf.display()))?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(anyhow!("buf build failed:\n{}", stderr.trim_end()));
    }
    fs::read_to_string(out.path())
        .with_context(|| format!("failed to read {}", out.path().display()))
}

fn buf_args(paths: &[PathBuf], exclude_imports: bool, out: &Path) -> Vec<OsString> {
    let mut args: Vec<OsString> = vec![
        "build".into(),
        ".".into(),
        "--as-file-descriptor-set".into(),
        "--exclude-source-info".into(),
    ];
    if exclude_imports {
        args.push("--exclude-imports".into());
    }
    for path in paths {
        args.push("--path".into());
        args.push(path.into());
    }
    args.push("-o".into());
    args.push(out.into());
    args
}

/// File names listed in a descriptor set, without decoding the rest.
fn file_names(text: &str) -> Result<HashSet<String>> {
    let set: Json = serde_json::from_str(text).context("invalid descriptor set from buf")?;
    Ok(set
        .get("file")
        .and_then(Json::as_array)
        .into_iter()
        .flatten()
        .filter_map(|file| file.get("name").and_then(Json::as_str))
        .map(str::to_string)
        .collect())
}

/// A throwaway v2 workspace: `m0` links to the module, `m1..` to the import
/// roots, so `buf` resolves imports across all of them.
fn import_workspace(root: &Path, import_paths: &[PathBuf]) -> Result<TempDir> {
    let dir = tempfile::Builder::new()
        .prefix("pbql-workspace-")
        .tempdir()
        .context("failed to create a temporary workspace")?;

    let mut roots = vec![root.to_path_buf()];
    for path in import_paths {
        let path = canonical(path)?;
        if !roots.contains(&path) {
            roots.push(path);
        }
    }

    let mut config = String::from("version: v2\nmodules:\n");
    for (i, target) in roots.iter().enumerate() {
        let name = format!("m{i}");
        link_dir(target, &dir.path().join(&name))
            .with_context(|| format!("failed to link {}", target.display()))?;
        config.push_str(&format!("  - path: {name}\n"));
    }
    fs::write(dir.path().join("buf.yaml"), config).context("failed to write buf.yaml")?;
    Ok(dir)
}

#[cfg(unix)]
fn link_dir(target: &Path, link: &Path) -> std::io::Result<()> {
    std::os::unix::fs::symlink(target, link)
}

#[cfg(windows)]
fn link_dir(target: &Path, link: &Path) -> std::io::Result<()> {
    std::os::windows::fs::symlink_dir(target, link)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SET: &str = r#"{
      "file": [
        {
          "name": "acme/v1/ping.proto",
          "package": "acme.v1",
          "messageType": [{"name": "Ping"}],
          "syntax": "proto3"
        }
      ]
    }"#;

    #[test]
    fn reads_json_descriptor_sets() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("set.json");
        fs::write(&path, SET).unwrap();

        let batches = collect_batches(&[path], &InputOptions::default()).unwrap();
        assert_eq!(batches.len(), 1);
        assert!(batches[0].targets.is_none());
        assert_eq!(batches[0].files[0].messages[0].full_name, "acme.v1.Ping");
    }

    #[test]
    fn invalid_json_names_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.json");
        fs::write(&path, "{").unwrap();

        let err = collect_batches(&[path], &InputOptions::default()).unwrap_err();
        assert!(format!("{err:#}").contains("broken.json"));
    }

    #[test]
    fn directories_without_protos_are_empty_batches() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("README.md"), "nothing here").unwrap();
        let options = InputOptions {
            buf: dir.path().join("no-such-buf"),
            ..Default::default()
        };

        let batches = collect_batches(&[dir.path().to_path_buf()], &options).unwrap();
        assert_eq!(batches.len(), 1);
        assert!(batches[0].files.is_empty());
        let (load, imports) = batches.into_iter().next().unwrap().split(&HashSet::new());
        assert!(load.is_empty() && imports.is_empty());
    }

    #[test]
    fn unsupported_and_missing_inputs() {
        let dir = tempfile::tempdir().unwrap();
        let txt = dir.path().join("notes.txt");
        fs::write(&txt, "").unwrap();
        let options = InputOptions::default();

        let err = collect_batches(&[txt], &options).unwrap_err();
        assert!(err.to_string().contains("unsupported input"));
        let err = collect_batches(&[dir.path().join("gone.json")], &options).unwrap_err();
        assert!(err.to_string().contains("does not exist"));
    }

    #[test]
    fn proto_files_resolve_to_their_module() {
        let dir = tempfile::tempdir().unwrap();
        let root = canonical(dir.path()).unwrap();
        let pkg = root.join("acme").join("v1");
        fs::create_dir_all(&pkg).unwrap();
        let file = pkg.join("ping.proto");
        fs::write(&file, "syntax = \"proto3\";").unwrap();

        assert_eq!(module_root(&file), pkg);
        assert_eq!(module_root(&pkg), pkg);

        fs::write(root.join("buf.yaml"), "version: v2").unwrap();
        assert_eq!(module_root(&file), root);
        assert_eq!(module_root(&pkg), root);
        assert_eq!(proto_files_under(&root), vec![file]);
    }

    #[test]
    fn split_loads_targets_once() {
        let file = |path: &str| FileDescriptor {
            path: path.into(),
            ..Default::default()
        };
        let batch = Batch {
            label: "protos".into(),
            files: vec![file("google/protobuf/timestamp.proto"), file("a.proto"), file("b.proto")],
            targets: Some(["a.proto", "b.proto"].map(String::from).into()),
            errors: Vec::new(),
        };
        let loaded: HashSet<String> = ["b.proto".to_string()].into();

        let (load, imports) = batch.split(&loaded);
        let names = |files: &[FileDescriptor]| -> Vec<String> {
            files.iter().map(|f| f.path.clone()).collect()
        };
        assert_eq!(names(&load), vec!["a.proto"]);
        assert_eq!(names(&imports), vec!["google/protobuf/timestamp.proto", "b.proto"]);
    }

    #[test]
    fn buf_is_limited_to_paths() {
        let args = buf_args(&[PathBuf::from("acme/a.proto")], true, Path::new("out.json"));
        let args: Vec<&str> = args.iter().map(|a| a.to_str().unwrap()).collect();
        assert_eq!(
            args,
            vec![
                "build",
                ".",
                "--as-file-descriptor-set",
                "--exclude-source-info",
                "--exclude-imports",
                "--path",
                "acme/a.proto",
                "-o",
                "out.json",
            ]
        );
    }

    #[test]
    fn file_names_only_reads_names() {
        let names = file_names(SET).unwrap();
        assert_eq!(names, HashSet::from(["acme/v1/ping.proto".to_string()]));
        assert!(file_names(r#"{"file": []}"#).unwrap().is_empty());
    }

    #[cfg(unix)]
    #[test]
    fn import_roots_become_workspace_modules() {
        let dir = tempfile::tempdir().unwrap();
        let base = canonical(dir.path()).unwrap();
        let module = base.join("shop");
        let common = base.join("common");
        fs::create_dir_all(&module).unwrap();
        fs::create_dir_all(&common).unwrap();
        fs::write(common.join("money.proto"), "syntax = \"proto3\";").unwrap();

        let workspace =
            import_workspace(&module, &[common.clone(), module.clone(), common]).unwrap();
        let config = fs::read_to_string(workspace.path().join("buf.yaml")).unwrap();
        assert_eq!(config, "version: v2\nmodules:\n  - path: m0\n  - path: m1\n");
        assert!(workspace.path().join("m1").join("money.proto").is_file());
        assert!(!workspace.path().join("m2").exists());
    }
}
