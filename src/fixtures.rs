//! Synthetic ELF shared objects for tests

use object::elf;
use object::write::elf::{FileHeader, Sym, Writer};
use object::Endianness;
use std::fs;
use std::path::{Path, PathBuf};

pub struct FixtureSymbol {
    pub name: String,
    pub defined: bool,
}

impl FixtureSymbol {
    pub fn defined(name: &str) -> Self {
        FixtureSymbol {
            name: name.to_string(),
            defined: true,
        }
    }

    pub fn imported(name: &str) -> Self {
        FixtureSymbol {
            name: name.to_string(),
            defined: false,
        }
    }
}

fn file_header(is_64: bool, endian: Endianness) -> FileHeader {
    let e_machine = match (is_64, endian) {
        (true, Endianness::Little) => elf::EM_X86_64,
        (true, Endianness::Big) => elf::EM_PPC64,
        (false, Endianness::Little) => elf::EM_386,
        (false, Endianness::Big) => elf::EM_PPC,
    };
    FileHeader {
        os_abi: elf::ELFOSABI_NONE,
        abi_version: 0,
        e_type: elf::ET_DYN,
        e_machine,
        e_entry: 0,
        e_flags: 0,
    }
}

/// Write a 64-bit little endian shared object whose `.dynsym` holds exactly `symbols`
pub fn write_shared_object(dir: &Path, file_name: &str, symbols: &[FixtureSymbol]) -> PathBuf {
    write_shared_object_as(dir, file_name, true, Endianness::Little, symbols)
}

/// Like `write_shared_object`, for any ELF class and byte order
pub fn write_shared_object_as(
    dir: &Path,
    file_name: &str,
    is_64: bool,
    endian: Endianness,
    symbols: &[FixtureSymbol],
) -> PathBuf {
    let mut buffer = Vec::new();
    {
        let mut writer = Writer::new(endian, is_64, &mut buffer);
        writer.reserve_file_header();

        let name_ids: Vec<_> = symbols
            .iter()
            .map(|s| writer.add_dynamic_string(s.name.as_bytes()))
            .collect();

        let dynsym_index = writer.reserve_dynsym_section_index();
        writer.reserve_dynstr_section_index();
        writer.reserve_shstrtab_section_index();

        writer.reserve_null_dynamic_symbol_index();
        for _ in symbols {
            writer.reserve_dynamic_symbol_index();
        }
        writer.reserve_dynsym();
        writer.reserve_dynstr();
        writer.reserve_shstrtab();
        writer.reserve_section_headers();

        writer.write_file_header(&file_header(is_64, endian)).unwrap();

        writer.write_null_dynamic_symbol();
        for (sym, name) in symbols.iter().zip(name_ids) {
            let st_shndx = if sym.defined {
                dynsym_index.0 as u16
            } else {
                elf::SHN_UNDEF
            };
            writer.write_dynamic_symbol(&Sym {
                name: Some(name),
                section: None,
                st_info: (elf::STB_GLOBAL << 4) | elf::STT_FUNC,
                st_other: elf::STV_DEFAULT,
                st_shndx,
                st_value: 0,
                st_size: 0,
            });
        }
        writer.write_dynstr();
        writer.write_shstrtab();

        writer.write_null_section_header();
        writer.write_dynsym_section_header(0, 1);
        writer.write_dynstr_section_header(0);
        writer.write_shstrtab_section_header();
    }

    let path = dir.join(file_name);
    fs::write(&path, buffer).unwrap();
    path
}

/// Write a valid ELF file that has no `.dynsym` section at all
pub fn write_object_without_dynsym(dir: &Path, file_name: &str) -> PathBuf {
    let mut buffer = Vec::new();
    {
        let mut writer = Writer::new(Endianness::Little, true, &mut buffer);
        writer.reserve_file_header();
        writer.reserve_shstrtab_section_index();
        writer.reserve_shstrtab();
        writer.reserve_section_headers();

        writer.write_file_header(&file_header(true, Endianness::Little)).unwrap();
        writer.write_shstrtab();
        writer.write_null_section_header();
        writer.write_shstrtab_section_header();
    }

    let path = dir.join(file_name);
    fs::write(&path, buffer).unwrap();
    path
}
