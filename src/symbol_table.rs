use object::elf;
use object::read::elf as elf_reader;
use object::read::elf::{FileHeader, SectionHeader, Sym};
use object::Endianness;
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::{AnalysisError, AnalysisResult};

const READ_OP: &str = "reading dynamic symbol table";

/// Whether a dynamic symbol is provided by the artifact or only referenced by it
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Definedness {
    Defined,
    Imported,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DynamicSymbol {
    pub name: String,
    pub definedness: Definedness,
}

/// Which dynamic symbols a `SymbolSet` keeps
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolMode {
    /// Only symbols whose section index is not `SHN_UNDEF`
    DefinedOnly,
    /// Every named entry of `.dynsym`, including imports
    All,
}

impl SymbolMode {
    fn admits(self, definedness: Definedness) -> bool {
        match self {
            SymbolMode::All => true,
            SymbolMode::DefinedOnly => definedness == Definedness::Defined,
        }
    }
}

/// The names of the dynamic symbols of one library, read in one mode
///
/// Names are compared exactly; C linkage is case sensitive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymbolSet {
    mode: SymbolMode,
    names: BTreeSet<String>,
}

impl SymbolSet {
    pub fn new(mode: SymbolMode) -> Self {
        SymbolSet {
            mode,
            names: BTreeSet::new(),
        }
    }

    pub fn from_names<I, S>(mode: SymbolMode, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        SymbolSet {
            mode,
            names: names.into_iter().map(Into::into).collect(),
        }
    }

    pub fn names(&self) -> &BTreeSet<String> {
        &self.names
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    #[cfg(test)]
    pub fn contains(&self, name: &str) -> bool {
        self.names.contains(name)
    }

    /// Names present in both sets
    pub fn intersection(&self, other: &SymbolSet) -> BTreeSet<String> {
        self.names.intersection(&other.names).cloned().collect()
    }

    /// Names present in `self` but absent from `other`
    pub fn difference(&self, other: &SymbolSet) -> BTreeSet<String> {
        self.names.difference(&other.names).cloned().collect()
    }

    fn absorb(&mut self, symbols: Vec<DynamicSymbol>) {
        for sym in symbols {
            if self.mode.admits(sym.definedness) {
                self.names.insert(sym.name);
            }
        }
    }
}

fn dynamic_symbols<Elf: elf_reader::FileHeader<Endian = Endianness>>(
    path: &Path,
    bytes: &[u8],
    obj: &Elf,
) -> AnalysisResult<Vec<DynamicSymbol>> {
    let end = obj
        .endian()
        .map_err(|e| AnalysisError::format(READ_OP, path, e))?;
    let sec_table = obj
        .sections(end, bytes)
        .map_err(|e| AnalysisError::format(READ_OP, path, e))?;

    if !sec_table
        .iter()
        .any(|sec| sec.sh_type(end) == elf::SHT_DYNSYM)
    {
        return Err(AnalysisError::format(
            READ_OP,
            path,
            "no dynamic symbol table (.dynsym)",
        ));
    }

    // `.dynsym` names live in the string table it links to (normally
    // `.dynstr`), which `symbols` resolves for us.
    let symbols = sec_table
        .symbols(end, bytes, elf::SHT_DYNSYM)
        .map_err(|e| AnalysisError::format(READ_OP, path, e))?;

    let mut res = Vec::new();
    for sym in symbols.iter() {
        let name_bytes = sym
            .name(end, symbols.strings())
            .map_err(|e| AnalysisError::format(READ_OP, path, e))?;
        // The null symbol and section symbols have no name
        if name_bytes.is_empty() {
            continue;
        }
        let name = String::from_utf8(name_bytes.to_vec())
            .map_err(|e| AnalysisError::format(READ_OP, path, e))?;
        let definedness = if sym.st_shndx(end) == elf::SHN_UNDEF {
            Definedness::Imported
        } else {
            Definedness::Defined
        };
        res.push(DynamicSymbol { name, definedness });
    }

    Ok(res)
}

/// Read every named entry of the artifact's dynamic symbol table
pub fn read_dynamic_symbols(path: &Path) -> AnalysisResult<Vec<DynamicSymbol>> {
    let bytes = fs::read(path).map_err(|e| AnalysisError::io(READ_OP, path, e))?;
    let syms = match elf::FileHeader64::<Endianness>::parse(bytes.as_slice()) {
        Ok(e64) => dynamic_symbols(path, bytes.as_slice(), e64)?,
        Err(_) => match elf::FileHeader32::<Endianness>::parse(bytes.as_slice()) {
            Ok(e32) => dynamic_symbols(path, bytes.as_slice(), e32)?,
            Err(e) => return Err(AnalysisError::format(READ_OP, path, e)),
        },
    };
    debug!(path = %path.display(), count = syms.len(), "read dynamic symbols");
    Ok(syms)
}

/// Load the dynamic symbols of a single artifact that `mode` admits
pub fn load_symbol_set(path: &Path, mode: SymbolMode) -> AnalysisResult<SymbolSet> {
    let mut set = SymbolSet::new(mode);
    set.absorb(read_dynamic_symbols(path)?);
    Ok(set)
}

/// Load the union of the symbol sets of all artifacts making up one library
pub fn load_library_symbols(paths: &[PathBuf], mode: SymbolMode) -> AnalysisResult<SymbolSet> {
    let mut set = SymbolSet::new(mode);
    for path in paths {
        set.absorb(read_dynamic_symbols(path)?);
    }
    Ok(set)
}
