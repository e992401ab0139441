use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

use tablec_core::naming::is_identifier;
use tablec_core::Top;

use crate::codec::emit_codec;
use crate::config::CodegenConfig;
use crate::declarations::emit_declarations;
use crate::error::CodegenError;
use crate::schema::CodegenSchema;
use crate::types::rust_ident;

/// Both artifacts as text, before anything touches the filesystem.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rendered {
    pub declarations: String,
    pub codec: String,
}

/// Paths of the files written by [`generate`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedFiles {
    pub declarations: PathBuf,
    pub codec: PathBuf,
}

pub fn render(
    top: &Top,
    module_name: &str,
    config: &CodegenConfig,
) -> Result<Rendered, CodegenError> {
    check_module_name(module_name, config)?;
    let schema = CodegenSchema::from_top(top, config)?;
    tracing::debug!(
        components = schema.components.len(),
        interfaces = schema.interfaces.len(),
        reset_hooks = schema.reset_hooks.len(),
        "schema resolved"
    );
    Ok(Rendered {
        declarations: emit_declarations(&schema),
        codec: emit_codec(&schema, module_name, config),
    })
}

/// Render both artifacts and write them into `out_dir`.
///
/// Nothing is written unless both render. Both files are staged next to
/// their targets and only renamed into place once both staged writes
/// succeed; the codec is renamed first, so a failure there leaves neither
/// artifact behind.
pub fn generate(
    top: &Top,
    out_dir: &Path,
    module_name: &str,
    config: &CodegenConfig,
) -> Result<GeneratedFiles, CodegenError> {
    let rendered = render(top, module_name, config)?;

    fs::create_dir_all(out_dir).map_err(|source| CodegenError::Io {
        path: out_dir.to_path_buf(),
        source,
    })?;
    let files = GeneratedFiles {
        declarations: out_dir.join(format!(
            "{}.{}",
            module_name, config.declarations_extension
        )),
        codec: out_dir.join(format!(
            "{}.{}",
            config.codec_file_stem, config.codec_extension
        )),
    };
    install(&[
        (files.codec.as_path(), rendered.codec.as_str()),
        (files.declarations.as_path(), rendered.declarations.as_str()),
    ])?;
    tracing::info!(
        declarations = %files.declarations.display(),
        codec = %files.codec.display(),
        "generated"
    );
    Ok(files)
}

fn check_module_name(module_name: &str, config: &CodegenConfig) -> Result<(), CodegenError> {
    if !is_identifier(module_name) || rust_ident(module_name, "module name")? != module_name {
        return Err(CodegenError::InvalidModuleName(module_name.to_owned()));
    }
    if module_name == config.codec_file_stem
        && config.declarations_extension == config.codec_extension
    {
        return Err(CodegenError::NameClash {
            name: format!("{}.{}", module_name, config.codec_extension),
            first: "declarations file".into(),
            second: "codec file".into(),
        });
    }
    Ok(())
}

/// Stage every output, then rename the staged files into place in order.
fn install(outputs: &[(&Path, &str)]) -> Result<(), CodegenError> {
    let mut staged: Vec<(PathBuf, &Path)> = Vec::with_capacity(outputs.len());
    for &(path, contents) in outputs {
        let tmp = staging_path(path);
        if let Err(source) = fs::write(&tmp, contents) {
            discard(&staged);
            let _ = fs::remove_file(&tmp);
            return Err(CodegenError::Io {
                path: tmp,
                source,
            });
        }
        staged.push((tmp, path));
    }
    for (i, (tmp, path)) in staged.iter().enumerate() {
        if let Err(source) = fs::rename(tmp, path) {
            discard(&staged[i..]);
            return Err(CodegenError::Io {
                path: path.to_path_buf(),
                source,
            });
        }
    }
    Ok(())
}

fn staging_path(path: &Path) -> PathBuf {
    let mut name = OsString::from(".");
    if let Some(file) = path.file_name() {
        name.push(file);
    }
    name.push(".tmp");
    path.with_file_name(name)
}

fn discard(staged: &[(PathBuf, &Path)]) {
    for (tmp, _) in staged {
        if let Err(err) = fs::remove_file(tmp) {
            tracing::warn!(path = %tmp.display(), error = %err, "could not remove staged file");
        }
    }
}
