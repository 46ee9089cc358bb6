/// The type of a declared entity, built from a C declarator inside out
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CType {
    /// A type named by specifiers alone, qualifiers included (`const char`, `struct bio_st`)
    Named(String),
    Pointer {
        pointee: Box<CType>,
        /// Qualifiers applied to the pointer itself (`char *const p`)
        qualifiers: Vec<String>,
    },
    Array {
        element: Box<CType>,
        size: Option<String>,
    },
    Function {
        returns: Box<CType>,
        params: Vec<Param>,
        variadic: bool,
    },
    /// A struct, union or enum defined inline, with its body
    Aggregate(String),
}

impl CType {
    #[cfg(test)]
    pub fn named(name: &str) -> Self {
        CType::Named(name.to_string())
    }

    #[cfg(test)]
    pub fn pointer_to(pointee: CType) -> Self {
        CType::Pointer {
            pointee: Box::new(pointee),
            qualifiers: Vec::new(),
        }
    }

    pub fn is_void(&self) -> bool {
        matches!(self, CType::Named(name) if name == "void")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Param {
    /// `None` for an unnamed prototype parameter
    pub name: Option<String>,
    pub ty: CType,
}

#[cfg(test)]
impl Param {
    pub fn new(name: &str, ty: CType) -> Self {
        Param {
            name: Some(name.to_string()),
            ty,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionDecl {
    pub name: String,
    /// Storage class and function specifiers (`extern`, `static`, `inline`)
    pub qualifiers: Vec<String>,
    /// `None` when the declaration has no type specifier
    pub return_type: Option<CType>,
    pub params: Vec<Param>,
    pub variadic: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectDecl {
    pub name: String,
    /// Storage class specifiers, plus `typedef` for type aliases
    pub qualifiers: Vec<String>,
    pub ty: CType,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MacroDecl {
    pub name: String,
    /// `None` for an object-like macro
    pub params: Option<Vec<String>>,
    pub body: String,
}

/// One structurally resolved header declaration
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Declaration {
    /// A name with no type, such as an enumerator
    Void { name: String },
    Function(FunctionDecl),
    Object(ObjectDecl),
    Macro(MacroDecl),
}

impl Declaration {
    pub fn name(&self) -> &str {
        match self {
            Declaration::Void { name } => name,
            Declaration::Function(f) => &f.name,
            Declaration::Object(o) => &o.name,
            Declaration::Macro(m) => &m.name,
        }
    }
}
