//! Synthetic ELF64 image builder for unit tests.

use crate::header::{ELF_MAGIC, ELF64_EHDR_SIZE, ELF64_SHDR_SIZE, ELFCLASS64, EM_X86_64, ET_REL};
use crate::section::SHT_STRTAB;
use crate::strtab::SHSTRTAB_NAME;

/// Build a minimal valid ELF64 header (64 bytes) with no sections.
///
/// Defaults: `ET_REL`, `EM_X86_64`, little-endian, `e_shentsize = 64`.
pub(crate) fn make_elf_header() -> Vec<u8> {
    let mut buf = vec![0u8; ELF64_EHDR_SIZE];

    buf[0..4].copy_from_slice(&ELF_MAGIC);
    buf[4] = ELFCLASS64;
    // Data: little-endian
    buf[5] = 1;
    // Version
    buf[6] = 1;
    buf[16..18].copy_from_slice(&ET_REL.to_le_bytes());
    buf[18..20].copy_from_slice(&EM_X86_64.to_le_bytes());
    buf[20..24].copy_from_slice(&1u32.to_le_bytes());
    buf[52..54].copy_from_slice(&(ELF64_EHDR_SIZE as u16).to_le_bytes());
    buf[58..60].copy_from_slice(&(ELF64_SHDR_SIZE as u16).to_le_bytes());

    buf
}

/// Build a symbol entry as raw bytes.
pub(crate) fn symbol(
    st_name: u32,
    st_info: u8,
    st_shndx: u16,
    st_value: u64,
    st_size: u64,
) -> [u8; 24] {
    let mut b = [0u8; 24];
    b[0..4].copy_from_slice(&st_name.to_le_bytes());
    b[4] = st_info;
    b[6..8].copy_from_slice(&st_shndx.to_le_bytes());
    b[8..16].copy_from_slice(&st_value.to_le_bytes());
    b[16..24].copy_from_slice(&st_size.to_le_bytes());
    b
}

/// Build a `Rela` entry as raw bytes.
pub(crate) fn rela(r_offset: u64, r_info: u64, r_addend: i64) -> [u8; 24] {
    let mut b = [0u8; 24];
    b[0..8].copy_from_slice(&r_offset.to_le_bytes());
    b[8..16].copy_from_slice(&r_info.to_le_bytes());
    b[16..24].copy_from_slice(&r_addend.to_le_bytes());
    b
}

/// Build a dynamic entry as raw bytes.
pub(crate) fn dyn_entry(d_tag: i64, d_val: u64) -> [u8; 16] {
    let mut b = [0u8; 16];
    b[0..8].copy_from_slice(&d_tag.to_le_bytes());
    b[8..16].copy_from_slice(&d_val.to_le_bytes());
    b
}

/// Accumulates NUL-terminated names, starting with the empty name at 0.
pub(crate) struct StrtabBuilder {
    data: Vec<u8>,
}

impl StrtabBuilder {
    pub(crate) fn new() -> Self {
        Self { data: vec![0] }
    }

    /// Append `name` and return its offset.
    pub(crate) fn add(&mut self, name: &str) -> u32 {
        let offset = u32::try_from(self.data.len()).unwrap();
        self.data.extend_from_slice(name.as_bytes());
        self.data.push(0);
        offset
    }

    pub(crate) fn finish(self) -> Vec<u8> {
        self.data
    }
}

/// One section to lay out in a synthetic image.
pub(crate) struct SectionSpec {
    name: String,
    sh_type: u32,
    flags: u64,
    addr: u64,
    link: u32,
    entsize: u64,
    data: Vec<u8>,
}

impl SectionSpec {
    pub(crate) fn new(name: &str, sh_type: u32) -> Self {
        Self {
            name: name.to_owned(),
            sh_type,
            flags: 0,
            addr: 0,
            link: 0,
            entsize: 0,
            data: Vec::new(),
        }
    }

    pub(crate) fn flags(mut self, flags: u64) -> Self {
        self.flags = flags;
        self
    }

    pub(crate) fn addr(mut self, addr: u64) -> Self {
        self.addr = addr;
        self
    }

    pub(crate) fn link(mut self, link: u32) -> Self {
        self.link = link;
        self
    }

    pub(crate) fn entsize(mut self, entsize: u64) -> Self {
        self.entsize = entsize;
        self
    }

    pub(crate) fn data(mut self, data: Vec<u8>) -> Self {
        self.data = data;
        self
    }
}

/// Lays out a complete image: header, section contents, `.shstrtab`, then
/// the section header table.
///
/// Section 0 is the null section; user sections follow in the order added
/// and `.shstrtab` comes last.
pub(crate) struct ElfBuilder {
    e_type: u16,
    sections: Vec<SectionSpec>,
    section_table: bool,
}

impl ElfBuilder {
    pub(crate) fn new() -> Self {
        Self {
            e_type: ET_REL,
            sections: Vec::new(),
            section_table: true,
        }
    }

    pub(crate) fn elf_type(mut self, e_type: u16) -> Self {
        self.e_type = e_type;
        self
    }

    pub(crate) fn section(mut self, spec: SectionSpec) -> Self {
        self.sections.push(spec);
        self
    }

    /// Emit only the header: `e_shnum`, `e_shoff` and `e_shstrndx` stay zero.
    pub(crate) fn without_section_table(mut self) -> Self {
        self.section_table = false;
        self
    }

    pub(crate) fn build(self) -> Vec<u8> {
        let mut buf = make_elf_header();
        buf[16..18].copy_from_slice(&self.e_type.to_le_bytes());
        if !self.section_table {
            return buf;
        }

        let mut shstrtab = StrtabBuilder::new();
        let mut headers = vec![[0u8; ELF64_SHDR_SIZE]];

        let mut sections = self.sections;
        sections.push(SectionSpec::new(SHSTRTAB_NAME, SHT_STRTAB));
        let shstrtab_index = sections.len();

        // Name offsets must be known before .shstrtab itself is written.
        let name_offsets: Vec<u32> = sections.iter().map(|s| shstrtab.add(&s.name)).collect();
        let shstrtab_data = shstrtab.finish();

        for (spec, name) in sections.iter().zip(name_offsets) {
            let data = if spec.sh_type == SHT_STRTAB && spec.name == SHSTRTAB_NAME {
                &shstrtab_data
            } else {
                &spec.data
            };
            align(&mut buf, 8);
            let offset = buf.len() as u64;
            buf.extend_from_slice(data);
            headers.push(section_header(spec, name, offset, data.len() as u64));
        }

        align(&mut buf, 8);
        let shoff = buf.len() as u64;
        for header in &headers {
            buf.extend_from_slice(header);
        }

        let shnum = u16::try_from(headers.len()).unwrap();
        let shstrndx = u16::try_from(shstrtab_index).unwrap();
        buf[40..48].copy_from_slice(&shoff.to_le_bytes());
        buf[60..62].copy_from_slice(&shnum.to_le_bytes());
        buf[62..64].copy_from_slice(&shstrndx.to_le_bytes());
        buf
    }
}

fn align(buf: &mut Vec<u8>, to: usize) {
    let padded = buf.len().next_multiple_of(to);
    buf.resize(padded, 0);
}

fn section_header(
    spec: &SectionSpec,
    sh_name: u32,
    sh_offset: u64,
    sh_size: u64,
) -> [u8; ELF64_SHDR_SIZE] {
    let mut b = [0u8; ELF64_SHDR_SIZE];
    b[0..4].copy_from_slice(&sh_name.to_le_bytes());
    b[4..8].copy_from_slice(&spec.sh_type.to_le_bytes());
    b[8..16].copy_from_slice(&spec.flags.to_le_bytes());
    b[16..24].copy_from_slice(&spec.addr.to_le_bytes());
    b[24..32].copy_from_slice(&sh_offset.to_le_bytes());
    b[32..40].copy_from_slice(&sh_size.to_le_bytes());
    b[40..44].copy_from_slice(&spec.link.to_le_bytes());
    // sh_info at 44..48 stays zero
    b[48..56].copy_from_slice(&1u64.to_le_bytes());
    b[56..64].copy_from_slice(&spec.entsize.to_le_bytes());
    b
}
