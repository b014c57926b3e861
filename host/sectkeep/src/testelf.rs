//! Builds minimal ELF executables for tests: a `.text` section, a symbol table and the string
//! tables, no program headers. Either class, either byte order.

use sectkeep_common::{RETENTION_ROOTS, TextSection};

const SHT_PROGBITS: u32 = 1;
const SHT_SYMTAB: u32 = 2;
const SHT_STRTAB: u32 = 3;
const SHF_ALLOC: u64 = 0x2;
const SHF_EXECINSTR: u64 = 0x4;
const STB_GLOBAL: u8 = 1;
const STT_NOTYPE: u8 = 0;
const SHN_UNDEF: u16 = 0;
const TEXT_INDEX: u16 = 1;

const SHSTRTAB: &[u8] = b"\0.text\0.symtab\0.strtab\0.shstrtab\0";
const NAME_TEXT: u32 = 1;
const NAME_SYMTAB: u32 = 7;
const NAME_STRTAB: u32 = 15;
const NAME_SHSTRTAB: u32 = 23;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Class {
    Elf32,
    Elf64,
}

impl Class {
    fn ehdr_size(self) -> usize {
        match self {
            Class::Elf32 => 52,
            Class::Elf64 => 64,
        }
    }
    fn phent_size(self) -> u16 {
        match self {
            Class::Elf32 => 32,
            Class::Elf64 => 56,
        }
    }
    fn shent_size(self) -> u16 {
        match self {
            Class::Elf32 => 40,
            Class::Elf64 => 64,
        }
    }
    fn sym_size(self) -> u64 {
        match self {
            Class::Elf32 => 16,
            Class::Elf64 => 24,
        }
    }
    fn word(self) -> u64 {
        match self {
            Class::Elf32 => 4,
            Class::Elf64 => 8,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Endian {
    Little,
    Big,
}

#[derive(Debug, Clone)]
struct TestSymbol {
    name: String,
    value: u64,
    shndx: u16,
}

#[derive(Debug, Clone)]
pub struct TestElf {
    class: Class,
    endian: Endian,
    text_addr: u64,
    text_size: u64,
    symbols: Vec<TestSymbol>,
    symtab: bool,
}

impl TestElf {
    pub fn new(class: Class, text_addr: u64, text_size: u64) -> Self {
        Self {
            class,
            endian: Endian::Little,
            text_addr,
            text_size,
            symbols: Vec::new(),
            symtab: true,
        }
    }

    /// `.text` starting at `base` holding the subsections back to back with the given sizes,
    /// every marker defined, and both retention roots.
    pub fn with_layout(class: Class, base: u64, sizes: [u64; 7]) -> Self {
        let mut elf = Self::new(class, base, sizes.iter().sum());
        let mut cursor = base;
        for (section, size) in TextSection::ALL.into_iter().zip(sizes) {
            elf = elf.symbol(section.start_symbol(), cursor);
            cursor += size;
            elf = elf.symbol(section.end_symbol(), cursor);
        }
        for root in RETENTION_ROOTS {
            elf = elf.symbol(root, base);
        }
        elf
    }

    pub fn endian(mut self, endian: Endian) -> Self {
        self.endian = endian;
        self
    }

    pub fn symbol(mut self, name: &str, value: u64) -> Self {
        self.symbols.push(TestSymbol {
            name: name.to_string(),
            value,
            shndx: TEXT_INDEX,
        });
        self
    }

    pub fn undefined(mut self, name: &str) -> Self {
        self.symbols.push(TestSymbol {
            name: name.to_string(),
            value: 0,
            shndx: SHN_UNDEF,
        });
        self
    }

    pub fn remove(mut self, name: &str) -> Self {
        self.symbols.retain(|s| s.name != name);
        self
    }

    pub fn without_symtab(mut self) -> Self {
        self.symtab = false;
        self
    }

    pub fn build(&self) -> Vec<u8> {
        let class = self.class;
        let endian = self.endian;
        let put = |out: &mut Vec<u8>, width, value| write_uint(out, endian, width, value);

        let mut strtab = vec![0u8];
        let mut symtab = vec![0u8; class.sym_size() as usize];
        for symbol in &self.symbols {
            let st_name = strtab.len() as u32;
            strtab.extend_from_slice(symbol.name.as_bytes());
            strtab.push(0);
            let st_info = (STB_GLOBAL << 4) | STT_NOTYPE;
            match class {
                Class::Elf32 => {
                    put(&mut symtab, 4, st_name as u64);
                    put(&mut symtab, 4, symbol.value);
                    put(&mut symtab, 4, 0);
                    symtab.push(st_info);
                    symtab.push(0);
                    put(&mut symtab, 2, symbol.shndx as u64);
                }
                Class::Elf64 => {
                    put(&mut symtab, 4, st_name as u64);
                    symtab.push(st_info);
                    symtab.push(0);
                    put(&mut symtab, 2, symbol.shndx as u64);
                    put(&mut symtab, 8, symbol.value);
                    put(&mut symtab, 8, 0);
                }
            }
        }

        // section contents, in file order
        let text_offset = class.ehdr_size() as u64;
        let symtab_offset = text_offset + self.text_size;
        let strtab_offset = symtab_offset + symtab.len() as u64;
        let shstrtab_offset = strtab_offset + strtab.len() as u64;
        let shoff = (shstrtab_offset + SHSTRTAB.len() as u64).next_multiple_of(8);

        let mut headers = vec![SectionHeader::default()];
        headers.push(SectionHeader {
            name: NAME_TEXT,
            kind: SHT_PROGBITS,
            flags: SHF_ALLOC | SHF_EXECINSTR,
            addr: self.text_addr,
            offset: text_offset,
            size: self.text_size,
            align: 16,
            ..SectionHeader::default()
        });
        if self.symtab {
            headers.push(SectionHeader {
                name: NAME_SYMTAB,
                kind: SHT_SYMTAB,
                offset: symtab_offset,
                size: symtab.len() as u64,
                link: 3,
                info: 1,
                align: class.word(),
                entsize: class.sym_size(),
                ..SectionHeader::default()
            });
            headers.push(SectionHeader {
                name: NAME_STRTAB,
                kind: SHT_STRTAB,
                offset: strtab_offset,
                size: strtab.len() as u64,
                align: 1,
                ..SectionHeader::default()
            });
        }
        let shstrndx = headers.len() as u64;
        headers.push(SectionHeader {
            name: NAME_SHSTRTAB,
            kind: SHT_STRTAB,
            offset: shstrtab_offset,
            size: SHSTRTAB.len() as u64,
            align: 1,
            ..SectionHeader::default()
        });

        let mut out = Vec::new();
        out.extend_from_slice(b"\x7fELF");
        out.push(match class {
            Class::Elf32 => 1,
            Class::Elf64 => 2,
        });
        out.push(match self.endian {
            Endian::Little => 1,
            Endian::Big => 2,
        });
        out.push(1); // EV_CURRENT
        out.resize(16, 0);
        put(&mut out, 2, 2); // ET_EXEC
        put(
            &mut out,
            2,
            match class {
                Class::Elf32 => 40, // EM_ARM
                Class::Elf64 => 183, // EM_AARCH64
            },
        );
        put(&mut out, 4, 1);
        let word = class.word() as usize;
        put(&mut out, word, self.text_addr); // e_entry
        put(&mut out, word, 0); // e_phoff
        put(&mut out, word, shoff);
        put(&mut out, 4, 0); // e_flags
        put(&mut out, 2, class.ehdr_size() as u64);
        put(&mut out, 2, class.phent_size() as u64);
        put(&mut out, 2, 0); // e_phnum
        put(&mut out, 2, class.shent_size() as u64);
        put(&mut out, 2, headers.len() as u64);
        put(&mut out, 2, shstrndx);
        assert_eq!(out.len(), class.ehdr_size());

        out.resize(out.len() + self.text_size as usize, 0);
        if self.symtab {
            out.extend_from_slice(&symtab);
            out.extend_from_slice(&strtab);
        } else {
            out.resize(shstrtab_offset as usize, 0);
        }
        out.extend_from_slice(SHSTRTAB);
        out.resize(shoff as usize, 0);
        for header in &headers {
            header.write(&mut out, class, self.endian);
        }
        out
    }
}

#[derive(Debug, Default, Clone)]
struct SectionHeader {
    name: u32,
    kind: u32,
    flags: u64,
    addr: u64,
    offset: u64,
    size: u64,
    link: u32,
    info: u32,
    align: u64,
    entsize: u64,
}

impl SectionHeader {
    fn write(&self, out: &mut Vec<u8>, class: Class, endian: Endian) {
        let word = class.word() as usize;
        let put = |out: &mut Vec<u8>, width, value| write_uint(out, endian, width, value);
        put(out, 4, self.name as u64);
        put(out, 4, self.kind as u64);
        put(out, word, self.flags);
        put(out, word, self.addr);
        put(out, word, self.offset);
        put(out, word, self.size);
        put(out, 4, self.link as u64);
        put(out, 4, self.info as u64);
        put(out, word, self.align);
        put(out, word, self.entsize);
    }
}

/// `value` truncated to its low `width` bytes.
fn write_uint(out: &mut Vec<u8>, endian: Endian, width: usize, value: u64) {
    match endian {
        Endian::Little => out.extend_from_slice(&value.to_le_bytes()[..width]),
        Endian::Big => out.extend_from_slice(&value.to_be_bytes()[8 - width..]),
    }
}
