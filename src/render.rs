//! Canonical text for structured declarations
//!
//! Functions render as compilable stubs so a candidate's headers can be
//! checked against them; everything else renders as a plain declaration.
//! Output depends only on the `Declaration` passed in.

use crate::declaration::{CType, Declaration, FunctionDecl, MacroDecl, ObjectDecl, Param};

/// A declaration shape that has no canonical single-line rendering
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum RenderError {
    #[error("`{0}` has a function pointer type")]
    FunctionPointer(String),
    #[error("`{0}` has a function type")]
    FunctionType(String),
    #[error("`{0}` has an inline struct, union or enum type")]
    NestedAggregate(String),
    #[error("`{0}` has an array type outside a declarator")]
    ArrayType(String),
}

fn render_type(ty: &CType, subject: &str) -> Result<String, RenderError> {
    match ty {
        CType::Named(name) => Ok(name.clone()),
        CType::Pointer {
            pointee,
            qualifiers,
        } => {
            let mut res = match pointee.as_ref() {
                CType::Function { .. } => return Err(RenderError::FunctionPointer(subject.to_string())),
                CType::Array { .. } => return Err(RenderError::ArrayType(subject.to_string())),
                other => render_type(other, subject)?,
            };
            res.push('*');
            for q in qualifiers {
                res.push(' ');
                res.push_str(q);
            }
            Ok(res)
        }
        CType::Array { .. } => Err(RenderError::ArrayType(subject.to_string())),
        CType::Function { .. } => Err(RenderError::FunctionType(subject.to_string())),
        CType::Aggregate(_) => Err(RenderError::NestedAggregate(subject.to_string())),
    }
}

/// `<type> <name>`, with array dimensions moved after the name
fn render_declarator(ty: &CType, name: &str) -> Result<String, RenderError> {
    let mut dims = String::new();
    let mut base = ty;
    while let CType::Array { element, size } = base {
        dims.push('[');
        dims.push_str(size.as_deref().unwrap_or(""));
        dims.push(']');
        base = element;
    }
    Ok(format!("{} {}{}", render_type(base, name)?, name, dims))
}

fn render_qualifiers(qualifiers: &[String]) -> String {
    qualifiers.iter().map(|q| format!("{} ", q)).collect()
}

fn render_params(params: &[Param], variadic: bool) -> Result<String, RenderError> {
    let mut parts = Vec::with_capacity(params.len() + 1);
    for (idx, param) in params.iter().enumerate() {
        // Definitions need every parameter named
        let name = match &param.name {
            Some(name) => name.clone(),
            None => format!("arg{}", idx),
        };
        parts.push(render_declarator(&param.ty, &name)?);
    }
    if variadic {
        parts.push("...".to_string());
    }
    Ok(parts.join(", "))
}

fn render_function(f: &FunctionDecl) -> Result<String, RenderError> {
    let (return_type, body) = match &f.return_type {
        Some(ty) if !ty.is_void() => (render_type(ty, &f.name)?, "{ return 0; }"),
        _ => ("void".to_string(), "{ }"),
    };
    Ok(format!(
        "{}{} {}({}) {}",
        render_qualifiers(&f.qualifiers),
        return_type,
        f.name,
        render_params(&f.params, f.variadic)?,
        body
    ))
}

fn render_object(o: &ObjectDecl) -> Result<String, RenderError> {
    Ok(format!(
        "{}{}",
        render_qualifiers(&o.qualifiers),
        render_declarator(&o.ty, &o.name)?
    ))
}

fn render_macro(m: &MacroDecl) -> String {
    let mut res = format!("#define {}", m.name);
    if let Some(params) = &m.params {
        res.push('(');
        res.push_str(&params.join(", "));
        res.push(')');
    }
    if !m.body.is_empty() {
        res.push(' ');
        res.push_str(&m.body);
    }
    res
}

/// Render one declaration
pub fn render(decl: &Declaration) -> Result<String, RenderError> {
    match decl {
        Declaration::Void { .. } => Ok(String::new()),
        Declaration::Function(f) => render_function(f),
        Declaration::Object(o) => render_object(o),
        Declaration::Macro(m) => Ok(render_macro(m)),
    }
}
