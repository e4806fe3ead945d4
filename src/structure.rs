//! Structure Builder: materialises the precomputed, method-specific files the
//! accelerated query methods run on.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::{Duration, Instant};

use log::info;

use crate::config::{HarnessConfig, MethodSpec};
use crate::error::{HarnessError, Result};
use crate::method::Method;
use crate::process;

/// Location of the data a method's trials run on. Created once per session
/// and only ever read afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructureHandle {
    method: Method,
    path: PathBuf,
}

impl StructureHandle {
    pub fn new(method: Method, path: impl Into<PathBuf>) -> Self {
        Self {
            method,
            path: path.into(),
        }
    }

    pub fn method(&self) -> Method {
        self.method
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }
}

pub struct StructureBuilder {
    preprocessor: PathBuf,
    instance: String,
    graph_input: PathBuf,
    timeout: Option<Duration>,
}

impl StructureBuilder {
    pub fn new(preprocessor: &Path, instance: &str, graph_input: &Path) -> Self {
        Self {
            preprocessor: preprocessor.to_path_buf(),
            instance: instance.to_string(),
            graph_input: graph_input.to_path_buf(),
            timeout: None,
        }
    }

    pub fn from_config(config: &HarnessConfig) -> Self {
        Self::new(&config.preprocessor, &config.instance, &config.graph_input)
            .with_timeout(config.timeout())
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Where the structure for `spec` lives once built.
    pub fn structure_path(&self, spec: &MethodSpec) -> PathBuf {
        if let Some(path) = &spec.structure {
            return path.clone();
        }
        if !spec.method.requires_preprocessing() {
            return self.graph_input.clone();
        }
        let prefix = spec.resolved_output_prefix(&self.instance, &self.graph_input);
        let extension = match spec.method {
            Method::Dm => spec.output_format.map(|f| f.extension()),
            other => other.structure_extension(),
        };
        match extension {
            Some(ext) => {
                let mut name = prefix.into_os_string();
                name.push(".");
                name.push(ext);
                PathBuf::from(name)
            }
            None => prefix,
        }
    }

    /// Arguments for one preprocessor invocation.
    pub fn preprocess_args(&self, spec: &MethodSpec) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec![
            "-m".into(),
            spec.method.as_str().into(),
        ];
        if let Some(format) = &spec.input_format {
            args.push("--input-format".into());
            args.push(format.into());
        }
        if let Some(mode) = spec.preprocessing_mode {
            args.push("--preprocessing-mode".into());
            args.push(mode.as_str().into());
        }
        if let Some(tnodes) = spec.tnodes_cnt {
            args.push("--tnodes-cnt".into());
            args.push(tnodes.to_string().into());
        }
        args.push("-i".into());
        args.push(self.graph_input.clone().into_os_string());
        args.push("-o".into());
        args.push(
            spec.resolved_output_prefix(&self.instance, &self.graph_input)
                .into_os_string(),
        );
        if let Some(format) = spec.output_format {
            args.push("--output-format".into());
            args.push(format.as_str().into());
        }
        if let Some(bits) = spec.int_size {
            args.push("--int-size".into());
            args.push(bits.to_string().into());
        }
        args
    }

    /// Build the structure for one method and block until the preprocessor
    /// exits. A failed or incomplete build is an error; the session must not
    /// go on to benchmark a missing structure.
    pub fn build(&self, spec: &MethodSpec) -> Result<StructureHandle> {
        if spec.structure.is_some() || !spec.method.requires_preprocessing() {
            return self.resolve(spec);
        }

        let path = self.structure_path(spec);
        let mut command = Command::new(process::resolve_program(&self.preprocessor));
        command.args(self.preprocess_args(spec));

        info!("building {} structure -> {}", spec.method, path.display());
        let start = Instant::now();
        process::run(command, self.timeout).map_err(|e| HarnessError::StructureBuild {
            method: spec.method,
            reason: e.to_string(),
        })?;

        if !path.exists() {
            return Err(HarnessError::StructureBuild {
                method: spec.method,
                reason: format!(
                    "preprocessor exited successfully but {} was not written",
                    path.display()
                ),
            });
        }
        info!(
            "built {} structure in {:.2}s",
            spec.method,
            start.elapsed().as_secs_f64()
        );
        Ok(StructureHandle::new(spec.method, path))
    }

    /// Use a structure that is expected to exist already.
    pub fn resolve(&self, spec: &MethodSpec) -> Result<StructureHandle> {
        let handle = StructureHandle::new(spec.method, self.structure_path(spec));
        if !handle.exists() {
            return Err(HarnessError::MissingStructure {
                method: spec.method,
                path: handle.path,
            });
        }
        Ok(handle)
    }

    /// Build (or, with `build` unset, resolve) every structure in order,
    /// stopping at the first failure.
    pub fn prepare_all<'a, I>(&self, specs: I, build: bool) -> Result<Vec<StructureHandle>>
    where
        I: IntoIterator<Item = &'a MethodSpec>,
    {
        let handles = specs
            .into_iter()
            .map(|spec| if build { self.build(spec) } else { self.resolve(spec) })
            .collect::<Result<Vec<_>>>()?;
        info!("{} structures ready", handles.len());
        Ok(handles)
    }
}
