//! Index of the declarations in a set of C headers
//!
//! Headers are parsed with tree-sitter's C grammar. Its error recovery means
//! a header using unexpanded macros still yields whatever declarations the
//! parser could make sense of; names it could not classify are found by the
//! raw text fallback instead.

use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use tree_sitter::{Node, Parser};

use crate::declaration::{CType, Declaration, FunctionDecl, MacroDecl, ObjectDecl, Param};
use crate::error::{AnalysisError, AnalysisResult};
use crate::token;

/// The partitions of the index, in lookup order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    Functions,
    FunctionMacros,
    Other,
}

impl Category {
    pub const LOOKUP_ORDER: [Category; 3] = [Category::Functions, Category::FunctionMacros, Category::Other];
}

/// A textual position in a header
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawLocus {
    pub path: PathBuf,
    /// 1-based
    pub line: usize,
}

impl fmt::Display for RawLocus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.path.display(), self.line)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexedDeclaration {
    pub declaration: Declaration,
    pub category: Category,
    pub locus: RawLocus,
}

/// Outcome of looking a name up in the index
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup<'a> {
    Structured(&'a IndexedDeclaration),
    /// The name occurs in a header but not in any declaration the index understood
    Unstructured(RawLocus),
    NotFound,
}

#[derive(Debug)]
pub struct DeclarationIndex {
    functions: HashMap<String, IndexedDeclaration>,
    function_macros: HashMap<String, IndexedDeclaration>,
    other: HashMap<String, IndexedDeclaration>,
    headers: Vec<(PathBuf, String)>,
}

impl DeclarationIndex {
    /// Read and parse every header
    ///
    /// Headers are processed in path order; when a name is declared more than
    /// once the first declaration is kept.
    pub fn build(paths: &[PathBuf]) -> AnalysisResult<Self> {
        let mut sorted = paths.to_vec();
        sorted.sort();
        let mut sources = Vec::with_capacity(sorted.len());
        for path in sorted {
            let bytes = fs::read(&path).map_err(|e| AnalysisError::io("reading header", &path, e))?;
            let text = String::from_utf8(bytes)
                .map_err(|e| AnalysisError::parse(&path, format!("not valid UTF-8 ({})", e)))?;
            sources.push((path, text));
        }
        Self::from_sources(sources)
    }

    /// Index headers already held in memory, in the order given
    pub fn from_sources(sources: Vec<(PathBuf, String)>) -> AnalysisResult<Self> {
        let mut index = DeclarationIndex {
            functions: HashMap::new(),
            function_macros: HashMap::new(),
            other: HashMap::new(),
            headers: Vec::new(),
        };

        for (path, text) in &sources {
            for entry in parse_header(path, text)? {
                index
                    .category_mut(entry.category)
                    .entry(entry.declaration.name().to_string())
                    .or_insert(entry);
            }
        }
        index.headers = sources;

        info!(
            headers = index.headers.len(),
            functions = index.len(Category::Functions),
            function_macros = index.len(Category::FunctionMacros),
            other = index.len(Category::Other),
            "built declaration index"
        );
        Ok(index)
    }

    fn category(&self, category: Category) -> &HashMap<String, IndexedDeclaration> {
        match category {
            Category::Functions => &self.functions,
            Category::FunctionMacros => &self.function_macros,
            Category::Other => &self.other,
        }
    }

    fn category_mut(&mut self, category: Category) -> &mut HashMap<String, IndexedDeclaration> {
        match category {
            Category::Functions => &mut self.functions,
            Category::FunctionMacros => &mut self.function_macros,
            Category::Other => &mut self.other,
        }
    }

    pub fn len(&self, category: Category) -> usize {
        self.category(category).len()
    }

    /// The first structural match, searching functions, then macros, then the rest
    pub fn structured(&self, name: &str) -> Option<&IndexedDeclaration> {
        Category::LOOKUP_ORDER
            .iter()
            .find_map(|&category| self.category(category).get(name))
    }

    /// The first token-bounded occurrence of `name` in any indexed header
    pub fn find_raw(&self, name: &str) -> Option<RawLocus> {
        self.headers.iter().find_map(|(path, text)| {
            token::bounded_occurrences(text, name)
                .next()
                .map(|offset| RawLocus {
                    path: path.clone(),
                    line: token::line_of_offset(text, offset),
                })
        })
    }

    pub fn lookup(&self, name: &str) -> Lookup<'_> {
        if let Some(decl) = self.structured(name) {
            return Lookup::Structured(decl);
        }
        match self.find_raw(name) {
            Some(locus) => Lookup::Unstructured(locus),
            None => Lookup::NotFound,
        }
    }
}

fn parse_header(path: &Path, text: &str) -> AnalysisResult<Vec<IndexedDeclaration>> {
    let mut parser = Parser::new();
    parser
        .set_language(&tree_sitter_c::LANGUAGE.into())
        .map_err(|e| AnalysisError::parse(path, e))?;
    let tree = parser
        .parse(text, None)
        .ok_or_else(|| AnalysisError::parse(path, "parser produced no syntax tree"))?;

    let root = tree.root_node();
    if root.has_error() {
        warn!(path = %path.display(), "header has syntax errors; some declarations may be skipped");
    }

    let mut collector = Collector {
        path,
        src: text,
        entries: Vec::new(),
    };
    collector.visit(root);
    debug!(path = %path.display(), declarations = collector.entries.len(), "parsed header");
    Ok(collector.entries)
}

fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn named_children<'tree>(node: Node<'tree>) -> Vec<Node<'tree>> {
    let mut cursor = node.walk();
    let children: Vec<_> = node.named_children(&mut cursor).collect();
    children
}

fn all_children<'tree>(node: Node<'tree>) -> Vec<Node<'tree>> {
    let mut cursor = node.walk();
    let children: Vec<_> = node.children(&mut cursor).collect();
    children
}

struct Collector<'a> {
    path: &'a Path,
    src: &'a str,
    entries: Vec<IndexedDeclaration>,
}

impl<'a> Collector<'a> {
    fn text(&self, node: Node) -> &'a str {
        node.utf8_text(self.src.as_bytes()).unwrap_or("")
    }

    fn push(&mut self, node: Node, category: Category, declaration: Declaration) {
        self.entries.push(IndexedDeclaration {
            declaration,
            category,
            locus: RawLocus {
                path: self.path.to_path_buf(),
                line: node.start_position().row + 1,
            },
        });
    }

    fn visit(&mut self, node: Node) {
        match node.kind() {
            "declaration" | "function_definition" => self.declaration(node),
            "type_definition" => self.type_definition(node),
            "preproc_function_def" => self.function_macro(node),
            "preproc_def" => self.object_macro(node),
            "enum_specifier" => self.enumerators(node),
            "translation_unit" | "preproc_if" | "preproc_ifdef" | "preproc_else" | "preproc_elif"
            | "preproc_elifdef" | "linkage_specification" | "declaration_list" | "ERROR" => {
                for child in named_children(node) {
                    self.visit(child);
                }
            }
            _ => {}
        }
    }

    /// Storage class specifiers and type qualifiers attached directly to a declaration
    fn specifiers(&self, node: Node) -> (Vec<String>, Vec<String>) {
        let mut storage = Vec::new();
        let mut qualifiers = Vec::new();
        for child in named_children(node) {
            match child.kind() {
                "storage_class_specifier" => storage.push(self.text(child).to_string()),
                "type_qualifier" => qualifiers.push(self.text(child).to_string()),
                _ => {}
            }
        }
        (storage, qualifiers)
    }

    fn base_type(&self, type_node: Node, qualifiers: &[String]) -> CType {
        let is_aggregate = matches!(
            type_node.kind(),
            "struct_specifier" | "union_specifier" | "enum_specifier"
        );
        if is_aggregate && type_node.child_by_field_name("body").is_some() {
            return CType::Aggregate(normalize_whitespace(self.text(type_node)));
        }
        let mut parts: Vec<&str> = qualifiers.iter().map(String::as_str).collect();
        let spelled = normalize_whitespace(self.text(type_node));
        parts.push(&spelled);
        CType::Named(parts.join(" "))
    }

    /// Unwrap a declarator from the outside in, wrapping `ty` at each layer
    fn declarator(&self, node: Option<Node>, ty: CType) -> (Option<String>, CType) {
        let node = match node {
            Some(node) => node,
            None => return (None, ty),
        };
        match node.kind() {
            "identifier" | "type_identifier" | "field_identifier" | "primitive_type" => {
                (Some(self.text(node).to_string()), ty)
            }
            "pointer_declarator" | "abstract_pointer_declarator" => {
                let qualifiers = named_children(node)
                    .into_iter()
                    .filter(|c| c.kind() == "type_qualifier")
                    .map(|c| self.text(c).to_string())
                    .collect();
                let ty = CType::Pointer {
                    pointee: Box::new(ty),
                    qualifiers,
                };
                self.declarator(node.child_by_field_name("declarator"), ty)
            }
            "array_declarator" | "abstract_array_declarator" => {
                let size = node
                    .child_by_field_name("size")
                    .map(|s| normalize_whitespace(self.text(s)));
                let ty = CType::Array {
                    element: Box::new(ty),
                    size,
                };
                self.declarator(node.child_by_field_name("declarator"), ty)
            }
            "function_declarator" | "abstract_function_declarator" => {
                let (params, variadic) = self.parameters(node.child_by_field_name("parameters"));
                let ty = CType::Function {
                    returns: Box::new(ty),
                    params,
                    variadic,
                };
                self.declarator(node.child_by_field_name("declarator"), ty)
            }
            "parenthesized_declarator" | "abstract_parenthesized_declarator" => {
                self.declarator(named_children(node).pop(), ty)
            }
            "init_declarator" | "attributed_declarator" => {
                let inner = node
                    .child_by_field_name("declarator")
                    .or_else(|| named_children(node).into_iter().next());
                self.declarator(inner, ty)
            }
            _ => (None, ty),
        }
    }

    fn parameters(&self, list: Option<Node>) -> (Vec<Param>, bool) {
        let mut params = Vec::new();
        let mut variadic = false;
        let list = match list {
            Some(list) => list,
            None => return (params, variadic),
        };

        for child in all_children(list) {
            match child.kind() {
                "parameter_declaration" => {
                    let base = match child.child_by_field_name("type") {
                        Some(type_node) => {
                            let (_, qualifiers) = self.specifiers(child);
                            self.base_type(type_node, &qualifiers)
                        }
                        None => continue,
                    };
                    let (name, ty) = self.declarator(child.child_by_field_name("declarator"), base);
                    params.push(Param { name, ty });
                }
                "variadic_parameter" | "..." => variadic = true,
                _ => {}
            }
        }

        // `f(void)` takes no parameters
        if let [only] = params.as_slice() {
            if only.name.is_none() && only.ty.is_void() {
                params.clear();
            }
        }
        (params, variadic)
    }

    fn declaration(&mut self, node: Node) {
        let type_node = match node.child_by_field_name("type") {
            Some(type_node) => type_node,
            None => return,
        };
        self.enumerators(type_node);
        let (storage, qualifiers) = self.specifiers(node);
        let base = self.base_type(type_node, &qualifiers);

        let mut cursor = node.walk();
        let declarators: Vec<Node> = node.children_by_field_name("declarator", &mut cursor).collect();
        for d in declarators {
            let (name, ty) = self.declarator(Some(d), base.clone());
            let name = match name {
                Some(name) => name,
                None => continue,
            };
            match ty {
                CType::Function {
                    returns,
                    params,
                    variadic,
                } => self.push(
                    d,
                    Category::Functions,
                    Declaration::Function(FunctionDecl {
                        name,
                        qualifiers: storage.clone(),
                        return_type: Some(*returns),
                        params,
                        variadic,
                    }),
                ),
                ty => self.push(
                    d,
                    Category::Other,
                    Declaration::Object(ObjectDecl {
                        name,
                        qualifiers: storage.clone(),
                        ty,
                    }),
                ),
            }
        }
    }

    fn type_definition(&mut self, node: Node) {
        let type_node = match node.child_by_field_name("type") {
            Some(type_node) => type_node,
            None => return,
        };
        self.enumerators(type_node);
        let (_, qualifiers) = self.specifiers(node);
        let base = self.base_type(type_node, &qualifiers);

        let mut cursor = node.walk();
        let declarators: Vec<Node> = node.children_by_field_name("declarator", &mut cursor).collect();
        for d in declarators {
            if let (Some(name), ty) = self.declarator(Some(d), base.clone()) {
                self.push(
                    d,
                    Category::Other,
                    Declaration::Object(ObjectDecl {
                        name,
                        qualifiers: vec!["typedef".to_string()],
                        ty,
                    }),
                );
            }
        }
    }

    fn enumerators(&mut self, type_node: Node) {
        if type_node.kind() != "enum_specifier" {
            return;
        }
        let body = match type_node.child_by_field_name("body") {
            Some(body) => body,
            None => return,
        };
        for enumerator in named_children(body) {
            if enumerator.kind() != "enumerator" {
                continue;
            }
            if let Some(name) = enumerator.child_by_field_name("name") {
                let name = self.text(name).to_string();
                self.push(enumerator, Category::Other, Declaration::Void { name });
            }
        }
    }

    fn macro_body(&self, node: Node) -> String {
        node.child_by_field_name("value")
            .map(|value| normalize_whitespace(&self.text(value).replace("\\\n", " ")))
            .unwrap_or_default()
    }

    fn function_macro(&mut self, node: Node) {
        let name = match node.child_by_field_name("name") {
            Some(name) => self.text(name).to_string(),
            None => return,
        };
        let params = node
            .child_by_field_name("parameters")
            .map(|list| {
                all_children(list)
                    .into_iter()
                    .filter(|c| matches!(c.kind(), "identifier" | "..."))
                    .map(|c| self.text(c).to_string())
                    .collect()
            })
            .unwrap_or_default();
        let body = self.macro_body(node);
        self.push(
            node,
            Category::FunctionMacros,
            Declaration::Macro(MacroDecl {
                name,
                params: Some(params),
                body,
            }),
        );
    }

    fn object_macro(&mut self, node: Node) {
        let name = match node.child_by_field_name("name") {
            Some(name) => self.text(name).to_string(),
            None => return,
        };
        let body = self.macro_body(node);
        self.push(
            node,
            Category::Other,
            Declaration::Macro(MacroDecl {
                name,
                params: None,
                body,
            }),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::{render, RenderError};
    use pretty_assertions::assert_eq;

    fn index(headers: &[(&str, &str)]) -> DeclarationIndex {
        DeclarationIndex::from_sources(
            headers
                .iter()
                .map(|(path, text)| (PathBuf::from(path), text.to_string()))
                .collect(),
        )
        .unwrap()
    }

    fn rendered(index: &DeclarationIndex, name: &str) -> String {
        render(&index.structured(name).unwrap().declaration).unwrap()
    }

    #[test]
    fn indexes_function_prototypes() {
        let idx = index(&[(
            "evp.h",
            "int foo(int a, char *b);\nconst char *OpenSSL_version(int type);\nvoid ERR_clear_error(void);\n",
        )]);
        assert_eq!(idx.len(Category::Functions), 3);
        assert_eq!(rendered(&idx, "foo"), "int foo(int a, char* b) { return 0; }");
        assert_eq!(
            rendered(&idx, "OpenSSL_version"),
            "const char* OpenSSL_version(int type) { return 0; }"
        );
        assert_eq!(rendered(&idx, "ERR_clear_error"), "void ERR_clear_error() { }");
        assert_eq!(idx.structured("foo").unwrap().locus.line, 1);
        assert_eq!(idx.structured("ERR_clear_error").unwrap().locus.line, 3);
    }

    #[test]
    fn typedef_names_and_variadics() {
        let idx = index(&[(
            "bio.h",
            "typedef struct bio_st BIO;\nint BIO_printf(BIO *bio, const char *format, ...);\n",
        )]);
        assert_eq!(
            rendered(&idx, "BIO_printf"),
            "int BIO_printf(BIO* bio, const char* format, ...) { return 0; }"
        );
        assert_eq!(rendered(&idx, "BIO"), "typedef struct bio_st BIO");
        assert_eq!(idx.structured("BIO").unwrap().category, Category::Other);
    }

    #[test]
    fn function_pointer_parameters_index_but_do_not_render() {
        let idx = index(&[(
            "ssl.h",
            "void SSL_CTX_set_verify(SSL_CTX *ctx, int mode, int (*cb)(int, X509_STORE_CTX *));\n",
        )]);
        let found = idx.structured("SSL_CTX_set_verify").unwrap();
        assert_eq!(found.category, Category::Functions);
        assert_eq!(
            render(&found.declaration),
            Err(RenderError::FunctionPointer("cb".to_string()))
        );
    }

    #[test]
    fn macros_are_split_by_shape() {
        let idx = index(&[(
            "crypto.h",
            "#define OPENSSL_free(addr) CRYPTO_free(addr, OPENSSL_FILE, OPENSSL_LINE)\n#define SSL_VERIFY_PEER 0x01\n",
        )]);
        assert_eq!(
            idx.structured("OPENSSL_free").unwrap().category,
            Category::FunctionMacros
        );
        assert_eq!(
            rendered(&idx, "OPENSSL_free"),
            "#define OPENSSL_free(addr) CRYPTO_free(addr, OPENSSL_FILE, OPENSSL_LINE)"
        );
        assert_eq!(idx.structured("SSL_VERIFY_PEER").unwrap().category, Category::Other);
        assert_eq!(rendered(&idx, "SSL_VERIFY_PEER"), "#define SSL_VERIFY_PEER 0x01");
    }

    #[test]
    fn functions_take_precedence_over_macros() {
        let idx = index(&[(
            "ssl.h",
            "#define SSL_free(s) SSL_free_impl(s)\nvoid SSL_free(SSL *s);\n",
        )]);
        let found = idx.structured("SSL_free").unwrap();
        assert_eq!(found.category, Category::Functions);
    }

    #[test]
    fn objects_and_enumerators() {
        let idx = index(&[(
            "ec.h",
            "extern const char SSL_version_str[];\ntypedef enum { POINT_CONVERSION_COMPRESSED = 2 } point_conversion_form_t;\n",
        )]);
        assert_eq!(
            rendered(&idx, "SSL_version_str"),
            "extern const char SSL_version_str[]"
        );
        assert_eq!(
            idx.structured("POINT_CONVERSION_COMPRESSED").unwrap().declaration,
            Declaration::Void {
                name: "POINT_CONVERSION_COMPRESSED".to_string()
            }
        );
        assert_eq!(
            render(&idx.structured("point_conversion_form_t").unwrap().declaration),
            Err(RenderError::NestedAggregate("point_conversion_form_t".to_string()))
        );
    }

    #[test]
    fn descends_into_conditional_blocks() {
        let idx = index(&[(
            "rand.h",
            "#ifndef HEADER_RAND_H\n# define HEADER_RAND_H\n# if 1\nint RAND_bytes(unsigned char *buf, int num);\n# else\nint RAND_pseudo_bytes(unsigned char *buf, int num);\n# endif\n#endif\n",
        )]);
        assert!(idx.structured("RAND_bytes").is_some());
        assert!(idx.structured("RAND_pseudo_bytes").is_some());
    }

    #[test]
    fn first_header_in_order_wins() {
        let idx = index(&[
            ("a.h", "int dup_fn(int a);\n"),
            ("b.h", "long dup_fn(long a);\n"),
        ]);
        let found = idx.structured("dup_fn").unwrap();
        assert_eq!(found.locus.path, PathBuf::from("a.h"));
        assert_eq!(rendered(&idx, "dup_fn"), "int dup_fn(int a) { return 0; }");
    }

    #[test]
    fn raw_fallback_reports_first_bounded_occurrence() {
        let idx = index(&[
            ("a.h", "int unrelated(void);\n"),
            ("b.h", "/* see also\n * X509_NAME_hash_old for the legacy digest\n */\n"),
        ]);
        assert_eq!(
            idx.lookup("X509_NAME_hash_old"),
            Lookup::Unstructured(RawLocus {
                path: PathBuf::from("b.h"),
                line: 2
            })
        );
        assert_eq!(idx.lookup("X509_NAME_hash"), Lookup::NotFound);
        assert_eq!(
            idx.find_raw("X509_NAME_hash_old").unwrap().to_string(),
            "b.h:2"
        );
    }

    #[test]
    fn builds_from_disk_in_path_order() {
        let dir = tempfile::tempdir().unwrap();
        let b = dir.path().join("b.h");
        let a = dir.path().join("a.h");
        fs::write(&b, "int shared(void);\n").unwrap();
        fs::write(&a, "void shared(void);\n").unwrap();

        let idx = DeclarationIndex::build(&[b, a.clone()]).unwrap();
        assert_eq!(idx.structured("shared").unwrap().locus.path, a);
    }

    #[test]
    fn invalid_utf8_header_is_a_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.h");
        fs::write(&path, [0x69, 0x6e, 0x74, 0x20, 0xff, 0xfe, 0x3b]).unwrap();
        let err = DeclarationIndex::build(&[path]).unwrap_err();
        assert!(matches!(err, AnalysisError::Parse { .. }));
        assert!(err.to_string().contains("bad.h"));
    }

    #[test]
    fn missing_header_is_an_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = DeclarationIndex::build(&[dir.path().join("gone.h")]).unwrap_err();
        assert!(matches!(err, AnalysisError::Io { .. }));
    }
}
