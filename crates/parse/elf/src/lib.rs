//! ELF64 x86-64 decoder for binary inspection tools.
//!
//! Decodes the header, section header table, string tables, symbol tables,
//! `Rela` relocations and dynamic entries of a 64-bit x86-64 ELF file into an
//! immutable [`ElfModel`], resolving the cross-references between them.
//! Nothing is written, relocated or loaded.
//!
//! # Usage
//!
//! ```no_run
//! use std::fs::File;
//! use std::io::BufReader;
//!
//! use elfscope_elf::ElfModel;
//!
//! let mut file = BufReader::new(File::open("a.out").expect("open"));
//! let elf = ElfModel::parse(&mut file).expect("valid ELF64 x86-64");
//! for sym in elf.static_symbols() {
//!     let name = elf.symbol_name(sym).unwrap_or_default();
//!     println!("{} {} {name}", sym.sym_type, sym.bind);
//! }
//! ```

#![forbid(unsafe_code)]

pub mod decode;
pub mod dynamic;
pub mod header;
pub mod model;
pub mod reloc;
pub mod section;
pub mod source;
pub mod strtab;
pub mod symbol;

#[cfg(test)]
mod testutil;

pub use dynamic::{DynamicEntry, DynamicTag, DynamicValue, DynamicValueKind, Elf64Dyn};
pub use header::{Elf64Header, ElfClass, ElfError, ElfType};
pub use model::{ElfModel, ElfReader};
pub use reloc::{Elf64Rela, Relocation, RelocationIndex, RelocationType, symbol_table_for};
pub use section::{
    Elf64SectionHeader, SHF_ALLOC, SHF_EXECINSTR, SHF_WRITE, SHT_DYNAMIC, SHT_DYNSYM, SHT_RELA,
    SHT_STRTAB, SHT_SYMTAB, Section, SectionCatalog, SectionFlags, SectionType,
};
pub use source::{ByteSource, ScopedRead};
pub use strtab::StringTable;
pub use symbol::{
    Elf64Symbol, SHN_ABS, SHN_COMMON, SHN_UNDEF, STB_GLOBAL, STB_LOCAL, STB_WEAK, STT_FUNC,
    STT_OBJECT, STT_SECTION, Symbol, SymbolBind, SymbolSection, SymbolTableKind, SymbolType,
};
