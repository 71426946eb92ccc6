//! Shader Code Generator
//!
//! Actor shaders are one minijinja template specialised per draw variant.

use std::borrow::Cow;
use std::sync::OnceLock;

use minijinja::{Environment, Error, ErrorKind, syntax::SyntaxConfig};
use rust_embed::RustEmbed;
use serde::Serialize;

use crate::renderer::DrawVariant;

static SHADER_ENV: OnceLock<Environment<'static>> = OnceLock::new();

pub const ACTOR_TEMPLATE: &str = "actor";

#[derive(RustEmbed)]
#[folder = "src/gpu/shaders"]
struct ShaderAssets;

fn get_env() -> &'static Environment<'static> {
    SHADER_ENV.get_or_init(|| {
        let mut env = Environment::new();

        let syntax = SyntaxConfig::builder()
            .block_delimiters("{$", "$}")
            .variable_delimiters("{{", "}}")
            .build()
            .expect("Failed to configure Jinja2 syntax");

        env.set_syntax(syntax);
        env.set_trim_blocks(true);
        env.set_lstrip_blocks(true);
        env.set_undefined_behavior(minijinja::UndefinedBehavior::SemiStrict);
        env.set_loader(shader_loader);

        env
    })
}

fn shader_loader(name: &str) -> Result<Option<String>, Error> {
    let filename = if std::path::Path::new(name)
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("wgsl"))
    {
        Cow::Borrowed(name)
    } else {
        Cow::Owned(format!("{name}.wgsl"))
    };

    match ShaderAssets::get(&filename) {
        Some(file) => std::str::from_utf8(file.data.as_ref())
            .map(|source| Some(source.to_string()))
            .map_err(|e| {
                Error::new(
                    ErrorKind::TemplateNotFound,
                    format!("Shader {filename} is not UTF-8: {e}"),
                )
            }),
        None => Ok(None),
    }
}

/// Template defines for one actor pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[allow(non_snake_case)]
pub struct ShaderDefines {
    pub SKINNED: bool,
    pub DEFORMED: bool,
}

impl From<DrawVariant> for ShaderDefines {
    fn from(variant: DrawVariant) -> Self {
        Self {
            SKINNED: variant.is_skinned(),
            DEFORMED: variant.is_deformed(),
        }
    }
}

pub struct ShaderGenerator;

impl ShaderGenerator {
    /// Renders the actor shader for `variant` to WGSL.
    pub fn generate_actor_shader(variant: DrawVariant) -> Result<String, Error> {
        let template = get_env().get_template(ACTOR_TEMPLATE)?;
        let source = template.render(ShaderDefines::from(variant))?;
        Ok(format!("// === Auto-generated Actor Shader ({variant:?}) ===\n{source}"))
    }
}
