//! The two directions of the LZW dictionary.
//!
//! The encoder asks whether a sequence is known and for its code, the decoder asks for the
//! sequence behind a code. Each direction has its own container, [`CodeTree`] and
//! [`CodeTable`], which grow and reset in lockstep when driven by matching coders.
//!
//! Every entry beyond the initial 256 is an existing entry extended by one byte. Both
//! containers exploit this and store an entry as its prefix code plus the final byte.
use crate::alloc::{vec, vec::Vec};
use crate::{Code, INITIAL_ENTRIES, MAX_ENTRIES};

/// The common contract of both dictionary directions.
pub trait Dictionary {
    /// Replace all entries with the 256 single byte sequences, code equal to byte value.
    fn reset(&mut self);

    /// The number of entries, which is also the code the next entry receives.
    fn len(&self) -> usize;

    /// If the dictionary must be reset before it can grow again.
    fn is_full(&self) -> bool {
        self.len() >= MAX_ENTRIES
    }
}

/// Mapping from sequences to codes.
///
/// One tree node for each code. To avoid using too much memory we keep nodes with few
/// successors in optimized form. This form doesn't offer lookup by indexing but instead does a
/// linear search.
pub struct CodeTree {
    simples: Vec<Simple>,
    complex: Vec<Full>,
    keys: Vec<FullKey>,
}

#[derive(Clone, Copy)]
enum FullKey {
    NoSuccessor,
    Simple(u32),
    Full(u32),
}

const SHORT: usize = 16;

/// Marks an absent successor in a `Full` node.
///
/// Successors are always appended entries, the single byte codes below `INITIAL_ENTRIES` never
/// continue another sequence.
const NO_SUCCESSOR: Code = 0;

#[derive(Clone, Copy)]
struct Simple {
    codes: [Code; SHORT],
    chars: [u8; SHORT],
    count: u8,
}

#[derive(Clone, Copy)]
struct Full {
    char_continuation: [Code; 256],
}

/// Mapping from codes to sequences.
///
/// Entries link back to their prefix, so a sequence is reconstructed back to front. The depth
/// and first byte of each entry are kept alongside to size the output and to derive new entries
/// without walking the chain.
///
/// The first entry after a reset may extend a sequence that only existed before the reset. Its
/// bytes are then stored whole and the chain of every later entry ends there.
pub struct CodeTable {
    inner: Vec<Link>,
    depths: Vec<u32>,
    carried: Vec<u8>,
}

#[derive(Clone, Copy)]
struct Link {
    prefix: Code,
    byte: u8,
    first: u8,
}

impl CodeTree {
    /// Create a tree in its initial state.
    pub fn new() -> Self {
        let mut tree = CodeTree {
            simples: Vec::new(),
            complex: Vec::new(),
            keys: Vec::with_capacity(MAX_ENTRIES),
        };
        tree.reset();
        tree
    }

    /// Look up the code of a complete sequence.
    pub fn get(&self, sequence: &[u8]) -> Option<Code> {
        let (&first, rest) = sequence.split_first()?;
        rest.iter()
            .try_fold(Code::from(first), |code, &ch| self.at_key(code, ch))
    }

    /// The code of the sequence of `code` extended by `ch`, if it is known.
    pub fn at_key(&self, code: Code, ch: u8) -> Option<Code> {
        match self.keys[usize::from(code)] {
            FullKey::NoSuccessor => None,
            FullKey::Simple(idx) => {
                let nexts = &self.simples[idx as usize];
                let successors = nexts
                    .codes
                    .iter()
                    .zip(nexts.chars.iter())
                    .take(usize::from(nexts.count));
                for (&scode, &sch) in successors {
                    if sch == ch {
                        return Some(scode);
                    }
                }

                None
            }
            FullKey::Full(idx) => {
                let full = &self.complex[idx as usize];
                let precode = full.char_continuation[usize::from(ch)];
                if precode != NO_SUCCESSOR {
                    Some(precode)
                } else {
                    None
                }
            }
        }
    }

    /// Iterate to the next char.
    ///
    /// Returns `Ok` with the code of the extended sequence when it was already in the tree.
    /// Otherwise creates a new entry for it and returns its code in `Err`. The tree must not be
    /// full.
    pub fn iterate(&mut self, code: Code, ch: u8) -> Result<Code, Code> {
        if let Some(next) = self.at_key(code, ch) {
            Ok(next)
        } else {
            Err(self.append(code, ch))
        }
    }

    fn append(&mut self, code: Code, ch: u8) -> Code {
        debug_assert!(!self.is_full());
        let next = self.keys.len() as Code;
        match self.keys[usize::from(code)] {
            FullKey::NoSuccessor => {
                let new_key = FullKey::Simple(self.simples.len() as u32);
                let mut simple = Simple::default();
                simple.codes[0] = next;
                simple.chars[0] = ch;
                simple.count = 1;
                self.simples.push(simple);
                self.keys[usize::from(code)] = new_key;
            }
            FullKey::Simple(idx) if usize::from(self.simples[idx as usize].count) < SHORT => {
                let nexts = &mut self.simples[idx as usize];
                let nidx = usize::from(nexts.count);
                nexts.chars[nidx] = ch;
                nexts.codes[nidx] = next;
                nexts.count += 1;
            }
            FullKey::Simple(idx) => {
                let new_key = FullKey::Full(self.complex.len() as u32);
                let simples = &self.simples[idx as usize];
                let mut full = Full {
                    char_continuation: [NO_SUCCESSOR; 256],
                };
                for (&pch, &pcont) in simples.chars.iter().zip(simples.codes.iter()) {
                    full.char_continuation[usize::from(pch)] = pcont;
                }
                full.char_continuation[usize::from(ch)] = next;
                self.complex.push(full);
                self.keys[usize::from(code)] = new_key;
            }
            FullKey::Full(idx) => {
                let full = &mut self.complex[idx as usize];
                full.char_continuation[usize::from(ch)] = next;
            }
        }
        self.keys.push(FullKey::NoSuccessor);
        next
    }
}

impl Dictionary for CodeTree {
    fn reset(&mut self) {
        self.simples.clear();
        self.complex.clear();
        self.keys.clear();
        self.keys.resize(INITIAL_ENTRIES, FullKey::NoSuccessor);
    }

    fn len(&self) -> usize {
        self.keys.len()
    }
}

impl Default for CodeTree {
    fn default() -> Self {
        CodeTree::new()
    }
}

impl CodeTable {
    /// Create a table in its initial state.
    pub fn new() -> Self {
        let mut table = CodeTable {
            inner: Vec::with_capacity(MAX_ENTRIES),
            depths: Vec::with_capacity(MAX_ENTRIES),
            carried: Vec::new(),
        };
        table.reset();
        table
    }

    /// The sequence of a code, if the code is assigned.
    pub fn get(&self, code: Code) -> Option<Vec<u8>> {
        let depth = *self.depths.get(usize::from(code))?;
        let mut sequence = vec![0; depth as usize];
        self.reconstruct(code, &mut sequence);
        Some(sequence)
    }

    /// The length of the sequence of an assigned code.
    pub fn depth(&self, code: Code) -> usize {
        self.depths[usize::from(code)] as usize
    }

    /// The first byte of the sequence of an assigned code.
    pub fn first_byte(&self, code: Code) -> u8 {
        self.inner[usize::from(code)].first
    }

    /// Append the sequence of `prefix` extended by `byte`, returning the new code.
    ///
    /// The table must not be full.
    pub fn derive(&mut self, prefix: Code, byte: u8) -> Code {
        debug_assert!(!self.is_full());
        let new_code = self.inner.len() as Code;
        let from = self.inner[usize::from(prefix)];
        let depth = self.depths[usize::from(prefix)] + 1;
        self.inner.push(Link {
            prefix,
            byte,
            first: from.first,
        });
        self.depths.push(depth);
        new_code
    }

    /// Append `sequence` extended by `byte` as the first entry of a freshly reset table.
    ///
    /// This is the successor of the last code before a reset, which is no longer in the table.
    pub fn derive_carried(&mut self, sequence: &[u8], byte: u8) -> Code {
        debug_assert_eq!(self.len(), INITIAL_ENTRIES);
        let new_code = self.inner.len() as Code;
        self.carried.clear();
        self.carried.extend_from_slice(sequence);
        self.carried.push(byte);
        self.inner.push(Link {
            prefix: 0,
            byte,
            first: self.carried[0],
        });
        self.depths.push(self.carried.len() as u32);
        new_code
    }

    /// Write the sequence of an assigned code into `out`, which must be exactly as long as its
    /// depth.
    pub fn reconstruct(&self, code: Code, out: &mut [u8]) {
        debug_assert_eq!(out.len(), self.depth(code));
        let mut code_iter = code;
        let mut remaining = out.len();
        while remaining > 0 {
            if usize::from(code_iter) == INITIAL_ENTRIES && !self.carried.is_empty() {
                out[..remaining].copy_from_slice(&self.carried);
                return;
            }

            let entry = &self.inner[usize::from(code_iter)];
            remaining -= 1;
            out[remaining] = entry.byte;
            code_iter = entry.prefix;
        }
    }
}

impl Dictionary for CodeTable {
    fn reset(&mut self) {
        self.inner.clear();
        self.depths.clear();
        self.carried.clear();
        for byte in 0..=u8::MAX {
            self.inner.push(Link::base(byte));
            self.depths.push(1);
        }
    }

    fn len(&self) -> usize {
        self.inner.len()
    }
}

impl Default for CodeTable {
    fn default() -> Self {
        CodeTable::new()
    }
}

impl Link {
    fn base(byte: u8) -> Self {
        Link {
            prefix: 0,
            byte,
            first: byte,
        }
    }
}

impl Default for Simple {
    fn default() -> Self {
        Simple {
            codes: [0; SHORT],
            chars: [0; SHORT],
            count: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{CodeTable, CodeTree, Dictionary};
    use crate::{Code, INITIAL_ENTRIES, MAX_ENTRIES};

    #[test]
    fn bootstrap_maps_bytes_to_themselves() {
        let tree = CodeTree::new();
        let table = CodeTable::new();
        assert_eq!(tree.len(), INITIAL_ENTRIES);
        assert_eq!(table.len(), INITIAL_ENTRIES);

        for byte in 0..=u8::MAX {
            assert_eq!(tree.get(&[byte]), Some(Code::from(byte)));
            assert_eq!(table.get(Code::from(byte)), Some(vec![byte]));
        }

        assert_eq!(tree.get(&[]), None);
        assert_eq!(tree.get(b"ab"), None);
        assert_eq!(table.get(INITIAL_ENTRIES as Code), None);
    }

    #[test]
    fn growth_assigns_consecutive_codes() {
        let mut tree = CodeTree::new();
        let mut table = CodeTable::new();

        assert_eq!(tree.iterate(Code::from(b'a'), b'b'), Err(256));
        assert_eq!(table.derive(Code::from(b'a'), b'b'), 256);
        assert_eq!(tree.iterate(Code::from(b'a'), b'b'), Ok(256));
        assert_eq!(tree.iterate(256, b'c'), Err(257));
        assert_eq!(table.derive(256, b'c'), 257);

        assert_eq!(tree.len(), 258);
        assert_eq!(table.len(), 258);
        assert_eq!(tree.get(b"abc"), Some(257));
        assert_eq!(table.get(257), Some(b"abc".to_vec()));
        assert_eq!(table.depth(257), 3);
        assert_eq!(table.first_byte(257), b'a');
    }

    #[test]
    fn many_successors_of_one_node() {
        let mut tree = CodeTree::new();
        let mut expected = Vec::new();
        // Enough successors to leave the optimized node form.
        for ch in 0..=u8::MAX {
            match tree.iterate(Code::from(b'x'), ch) {
                Err(code) => expected.push(code),
                Ok(_) => panic!("successor {} already known", ch),
            }
        }

        for (ch, &code) in (0..=u8::MAX).zip(expected.iter()) {
            assert_eq!(tree.get(&[b'x', ch]), Some(code));
            assert_eq!(tree.iterate(Code::from(b'x'), ch), Ok(code));
        }
        assert_eq!(tree.len(), INITIAL_ENTRIES + 256);
    }

    #[test]
    fn reset_restores_initial_state() {
        let mut tree = CodeTree::new();
        let mut table = CodeTable::new();
        let mut code = Code::from(b'z');
        let mut prefix = Code::from(b'z');
        while !tree.is_full() {
            code = tree.iterate(code, b'z').unwrap_err();
            prefix = table.derive(prefix, b'z');
            assert_eq!(code, prefix);
        }

        assert_eq!(tree.len(), MAX_ENTRIES);
        assert!(table.is_full());
        assert_eq!(table.depth(Code::MAX), MAX_ENTRIES - INITIAL_ENTRIES + 1);

        tree.reset();
        table.reset();
        assert_eq!(tree.len(), INITIAL_ENTRIES);
        assert_eq!(table.len(), INITIAL_ENTRIES);
        assert_eq!(tree.get(b"zz"), None);
        assert_eq!(tree.get(b"z"), Some(Code::from(b'z')));
        assert_eq!(table.get(Code::from(b'z')), Some(vec![b'z']));
    }

    #[test]
    fn carried_sequence_starts_fresh_table() {
        let mut table = CodeTable::new();
        let abc = table.derive(Code::from(b'a'), b'b');
        let abc = table.derive(abc, b'c');
        let sequence = table.get(abc).unwrap();

        table.reset();
        let carried = table.derive_carried(&sequence, b'd');
        assert_eq!(carried, INITIAL_ENTRIES as Code);
        assert_eq!(table.get(carried), Some(b"abcd".to_vec()));
        assert_eq!(table.first_byte(carried), b'a');

        let next = table.derive(carried, b'e');
        assert_eq!(table.get(next), Some(b"abcde".to_vec()));
        assert_eq!(table.depth(next), 5);
        let other = table.derive(Code::from(b'x'), b'y');
        assert_eq!(table.get(other), Some(b"xy".to_vec()));

        table.reset();
        let plain = table.derive(Code::from(b'q'), b'r');
        assert_eq!(table.get(plain), Some(b"qr".to_vec()));
    }
}
