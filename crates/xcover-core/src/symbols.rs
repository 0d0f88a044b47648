//! ELF symbol discovery and file-offset resolution (spec §4.1).

use std::path::Path;

use object::{Object, ObjectSection, ObjectSymbol, ObjectSymbolTable, SectionFlags, SymbolKind};
use xcover_common::Binding;

use crate::error::CoreError;

/// One `FUNC`-typed symbol read from an ELF image, before offset resolution.
#[derive(Debug, Clone)]
pub struct RawSymbol {
    pub name: String,
    pub value: u64,
    pub size: u64,
    pub binding: Binding,
}

/// Opens `path` as an ELF image and returns the union of its static and
/// dynamic symbol tables, filtered to `FUNC`-typed entries.
///
/// Fails with [`CoreError::NoSymbols`] if both tables are absent or empty,
/// since coverage is meaningless against a stripped binary.
pub fn read_function_symbols(path: &Path) -> Result<(Vec<RawSymbol>, Vec<u8>), CoreError> {
    let content = std::fs::read(path)?;
    let object = object::File::parse(&*content).map_err(|_| CoreError::ElfFileNil)?;

    let mut symbols = Vec::new();

    if let Some(table) = object.symbol_table() {
        symbols.extend(table.symbols().filter_map(raw_symbol_from));
    }
    if let Some(table) = object.dynamic_symbol_table() {
        symbols.extend(table.symbols().filter_map(raw_symbol_from));
    }

    if symbols.is_empty() {
        return Err(CoreError::NoSymbols);
    }

    Ok((symbols, content))
}

fn raw_symbol_from(symbol: object::read::Symbol<'_, '_>) -> Option<RawSymbol> {
    if symbol.kind() != SymbolKind::Text {
        return None;
    }
    let name = symbol.name().ok()?;
    if name.is_empty() {
        return None;
    }

    let binding = if symbol.is_weak() {
        Binding::Weak
    } else if symbol.is_global() {
        Binding::Global
    } else {
        Binding::Local
    };

    Some(RawSymbol {
        name: name.to_string(),
        value: symbol.address(),
        size: symbol.size(),
        binding,
    })
}

/// A resolved (name, file-offset) pair, ready for probe attachment.
#[derive(Debug, Clone)]
pub struct ResolvedSymbol {
    pub name: String,
    pub binding: Binding,
    pub file_offset: u64,
}

const ALLOC_EXEC: u64 = {
    // object's `SectionFlags::Elf { sh_flags }` carries the raw ELF flags;
    // SHF_ALLOC | SHF_EXECINSTR.
    0x2 | 0x4
};

/// Translates each symbol's virtual address into a file offset by locating
/// the unique allocatable-and-executable section that encloses it.
///
/// `file_offset = symbol.value - section.addr + section.file_offset`.
/// Symbols with no enclosing section are dropped with a debug log — not
/// fatal, per spec §4.1 ("exotic link maps").
pub fn resolve_offsets(content: &[u8], symbols: Vec<RawSymbol>) -> Vec<ResolvedSymbol> {
    let object = match object::File::parse(content) {
        Ok(o) => o,
        Err(_) => return Vec::new(),
    };

    let exec_sections: Vec<(u64, u64, u64)> = object
        .sections()
        .filter(|s| is_alloc_exec(s.flags()))
        .map(|s| (s.address(), s.size(), s.file_range().map(|(off, _)| off).unwrap_or(0)))
        .collect();

    let mut resolved = Vec::with_capacity(symbols.len());
    for sym in symbols {
        let hit = exec_sections
            .iter()
            .find(|(addr, size, _)| sym.value >= *addr && sym.value < addr + size);

        match hit {
            Some((addr, _, file_off)) => {
                let file_offset = sym.value - addr + file_off;
                resolved.push(ResolvedSymbol {
                    name: sym.name,
                    binding: sym.binding,
                    file_offset,
                });
            }
            None => {
                tracing::debug!(symbol = %sym.name, value = sym.value, "no enclosing ALLOC|EXECINSTR section; dropping symbol");
            }
        }
    }
    resolved
}

fn is_alloc_exec(flags: SectionFlags) -> bool {
    match flags {
        SectionFlags::Elf { sh_flags } => sh_flags & ALLOC_EXEC == ALLOC_EXEC,
        _ => false,
    }
}
