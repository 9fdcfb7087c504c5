/*****************************************************************************************[clause.rs]
Copyright (c) 2003-2006, Niklas Een, Niklas Sorensson (MiniSat)
Copyright (c) 2007-2010, Niklas Sorensson (MiniSat)

Permission is hereby granted, free of charge, to any person obtaining a copy of this software and
associated documentation files (the "Software"), to deal in the Software without restriction,
including without limitation the rights to use, copy, modify, merge, publish, distribute,
sublicense, and/or sell copies of the Software, and to permit persons to whom the Software is
furnished to do so, subject to the following conditions:

The above copyright notice and this permission notice shall be included in all copies or
substantial portions of the Software.

THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR IMPLIED, INCLUDING BUT
NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY, FITNESS FOR A PARTICULAR PURPOSE AND
NONINFRINGEMENT. IN NO EVENT SHALL THE AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM,
DAMAGES OR OTHER LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM, OUT
OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE SOFTWARE.
**************************************************************************************************/

use {
    crate::intmap::{AsIndex, IntMap, IntSet},
    std::{fmt, ops, slice},
};

/// A boolean variable, a dense index starting at 0.
///
/// Variables are never reused; a variable taken out of service is merely made
/// non-decision.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct Var(u32);

impl fmt::Debug for Var {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.0 == !0 {
            write!(f, "UNDEF")
        } else {
            write!(f, "{}", self.0 + 1)
        }
    }
}

impl Var {
    pub const UNDEF: Var = Var(!0);

    #[inline(always)]
    pub(crate) fn from_idx(idx: u32) -> Self {
        debug_assert!(idx < u32::MAX / 2, "Var::from_idx: index too large");
        Var(idx)
    }

    #[inline(always)]
    pub fn idx(&self) -> u32 {
        self.0
    }
}

impl AsIndex for Var {
    fn as_index(self) -> usize {
        self.0 as usize
    }
    fn from_index(index: usize) -> Self {
        Var(index as u32)
    }
}

pub type VMap<V> = IntMap<Var, V>;

/// A literal: a variable together with a polarity, encoded as `2*var + neg`.
///
/// Negation is a XOR on the lowest bit, so literals double as dense array
/// indices with no extra translation.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct Lit(u32);

impl Lit {
    pub const UNDEF: Lit = Lit(!1);
    pub const ERROR: Lit = Lit(!0);

    #[inline(always)]
    pub fn new(var: Var, sign: bool) -> Self {
        Lit(var.0 * 2 + (!sign) as u32)
    }

    #[inline(always)]
    pub fn idx(&self) -> u32 {
        self.0
    }

    /// `true` for a positive literal.
    #[inline(always)]
    pub fn sign(&self) -> bool {
        (self.0 & 1) == 0
    }

    #[inline(always)]
    pub fn var(&self) -> Var {
        Var(self.0 >> 1)
    }

    /// Keep the same literal if `sign == true`, negate it otherwise.
    #[inline(always)]
    pub fn apply_sign(&self, sign: bool) -> Lit {
        if sign {
            *self
        } else {
            !*self
        }
    }

    #[inline(always)]
    pub(crate) fn from_code(code: u32) -> Self {
        Lit(code)
    }
}

impl fmt::Debug for Lit {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.0 == !0 {
            write!(f, "ERROR")
        } else if self.0 == !1 {
            write!(f, "UNDEF")
        } else {
            write!(f, "{}{:?}", if self.sign() { "" } else { "-" }, self.var())
        }
    }
}

impl ops::Not for Lit {
    type Output = Self;
    #[inline(always)]
    fn not(self) -> Self {
        Lit(self.0 ^ 1)
    }
}

impl ops::BitXor<bool> for Lit {
    type Output = Self;
    fn bitxor(self, rhs: bool) -> Self {
        Lit(self.0 ^ rhs as u32)
    }
}

impl AsIndex for Lit {
    #[inline(always)]
    fn as_index(self) -> usize {
        self.0 as usize
    }
    #[inline(always)]
    fn from_index(index: usize) -> Self {
        Lit(index as u32)
    }
}

pub type LMap<V> = IntMap<Lit, V>;
pub type LSet = IntSet<Lit>;

/// A ternary boolean (true, false, undefined) used for partial assignments.
#[allow(non_camel_case_types)]
#[derive(Clone, Copy)]
pub struct lbool(u8);

impl fmt::Debug for lbool {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.0 == 0 {
            write!(f, "TRUE")
        } else if self.0 == 1 {
            write!(f, "FALSE")
        } else {
            write!(f, "UNDEF")
        }
    }
}

impl Default for lbool {
    fn default() -> Self {
        lbool::UNDEF
    }
}

impl lbool {
    pub const TRUE: lbool = lbool(0);
    pub const FALSE: lbool = lbool(1);
    pub const UNDEF: lbool = lbool(2);

    pub fn from_u8(v: u8) -> Self {
        debug_assert!(v == (v & 3), "lbool::from_u8: invalid value");
        lbool(v)
    }

    #[inline(always)]
    pub fn new(v: bool) -> Self {
        lbool((!v) as u8)
    }

    #[inline(always)]
    pub fn to_u8(&self) -> u8 {
        self.0
    }
}

// Both 2 and 3 denote UNDEF, so that XOR-ing with a sign bit is closed.
impl PartialEq for lbool {
    #[inline(always)]
    fn eq(&self, rhs: &Self) -> bool {
        self.0 == rhs.0 || (self.0 & rhs.0 & 2) != 0
    }
}

impl Eq for lbool {}

impl ops::Neg for lbool {
    type Output = lbool;
    fn neg(self) -> Self {
        lbool(self.0 ^ 1)
    }
}

impl ops::BitXor<bool> for lbool {
    type Output = lbool;

    /// Negates the value iff `rhs` is `true`; `UNDEF` stays `UNDEF`.
    #[inline(always)]
    fn bitxor(self, rhs: bool) -> Self {
        lbool(self.0 ^ rhs as u8)
    }
}

impl From<bool> for lbool {
    fn from(x: bool) -> Self {
        if x {
            lbool::TRUE
        } else {
            lbool::FALSE
        }
    }
}

/// The source of a clause, reported to callbacks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    /// Part of the input problem.
    Axiom,
    /// Derived by conflict analysis.
    Learnt,
}

/// Reference to a clause living in the [`ClauseAllocator`].
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct CRef(u32);

impl CRef {
    pub const UNDEF: CRef = CRef(!0);
}

impl fmt::Debug for CRef {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if *self == CRef::UNDEF {
            write!(f, "CRef::UNDEF")
        } else {
            write!(f, "CRef({})", self.0)
        }
    }
}

/// Metadata word of a clause.
///
/// Layout:
/// mark    : 2  (1 = deleted)
/// learnt  : 1
/// reloced : 1
/// size    : 28
#[derive(Clone, Copy)]
pub struct ClauseHeader(u32);

impl fmt::Debug for ClauseHeader {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("ClauseHeader")
            .field("mark", &self.mark())
            .field("learnt", &self.learnt())
            .field("reloced", &self.reloced())
            .field("size", &self.size())
            .finish()
    }
}

impl ClauseHeader {
    pub fn new(learnt: bool, size: u32) -> Self {
        debug_assert!(size < (1 << 28));
        ClauseHeader(((learnt as u32) << 29) | size)
    }

    #[inline(always)]
    pub fn mark(&self) -> u32 {
        self.0 >> 30
    }
    #[inline(always)]
    pub fn learnt(&self) -> bool {
        (self.0 & (1 << 29)) != 0
    }
    #[inline(always)]
    pub fn reloced(&self) -> bool {
        (self.0 & (1 << 28)) != 0
    }
    #[inline(always)]
    pub fn size(&self) -> u32 {
        self.0 & ((1 << 28) - 1)
    }

    pub fn set_mark(&mut self, mark: u32) {
        debug_assert!(mark < 4);
        self.0 = (self.0 & !(3 << 30)) | (mark << 30);
    }
    pub fn set_reloced(&mut self, reloced: bool) {
        self.0 = (self.0 & !(1 << 28)) | ((reloced as u32) << 28);
    }
    pub fn set_size(&mut self, size: u32) {
        debug_assert!(size < (1 << 28));
        self.0 = (self.0 & !((1 << 28) - 1)) | size;
    }
}

/// Number of words a learnt clause carries after its literals
/// (activity and LBD).
const LEARNT_EXTRA: u32 = 2;

/// A shared reference to some clause.
#[derive(Clone, Copy)]
pub(crate) struct ClauseRef<'a> {
    header: ClauseHeader,
    /// Literal codes followed by the extra words of a learnt clause.
    data: &'a [u32],
}

impl<'a> fmt::Debug for ClauseRef<'a> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Clause")
            .field("header", &self.header)
            .field("lits", &self.lits())
            .finish()
    }
}

impl<'a> ClauseRef<'a> {
    #[inline(always)]
    pub fn mark(&self) -> u32 {
        self.header.mark()
    }
    #[inline(always)]
    pub fn learnt(&self) -> bool {
        self.header.learnt()
    }
    #[inline(always)]
    pub fn reloced(&self) -> bool {
        self.header.reloced()
    }
    #[inline(always)]
    pub fn size(&self) -> u32 {
        self.header.size()
    }

    #[inline(always)]
    pub fn activity(&self) -> f32 {
        debug_assert!(self.learnt());
        f32::from_bits(self.data[self.size() as usize])
    }

    #[inline(always)]
    pub fn lbd(&self) -> u32 {
        debug_assert!(self.learnt());
        self.data[self.size() as usize + 1]
    }

    #[inline(always)]
    pub fn lits(&self) -> &'a [Lit] {
        let sz = self.size() as usize;
        // `Lit` is repr(transparent) over u32, so the slice layouts agree
        unsafe { slice::from_raw_parts(self.data.as_ptr() as *const Lit, sz) }
    }

    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &'a Lit> {
        self.lits().iter()
    }

    fn raw_data(&self) -> &'a [u32] {
        self.data
    }
}

impl<'a> ops::Index<u32> for ClauseRef<'a> {
    type Output = Lit;
    #[inline(always)]
    fn index(&self, index: u32) -> &Self::Output {
        &self.lits()[index as usize]
    }
}

/// An exclusive reference to some clause.
pub(crate) struct ClauseMut<'a> {
    /// Header word followed by literal codes and the learnt extras.
    data: &'a mut [u32],
}

impl<'a> ClauseMut<'a> {
    #[inline(always)]
    fn header(&self) -> ClauseHeader {
        ClauseHeader(self.data[0])
    }

    fn set_header(&mut self, h: ClauseHeader) {
        self.data[0] = h.0;
    }

    #[inline(always)]
    pub fn size(&self) -> u32 {
        self.header().size()
    }
    #[inline(always)]
    pub fn learnt(&self) -> bool {
        self.header().learnt()
    }
    #[inline(always)]
    pub fn reloced(&self) -> bool {
        self.header().reloced()
    }

    pub fn set_mark(&mut self, mark: u32) {
        let mut h = self.header();
        h.set_mark(mark);
        self.set_header(h);
    }

    pub fn set_reloced(&mut self, reloced: bool) {
        let mut h = self.header();
        h.set_reloced(reloced);
        self.set_header(h);
    }

    #[inline(always)]
    pub fn lit(&self, i: u32) -> Lit {
        Lit::from_code(self.data[1 + i as usize])
    }

    #[inline(always)]
    pub fn set_lit(&mut self, i: u32, lit: Lit) {
        self.data[1 + i as usize] = lit.idx();
    }

    /// Swap the literals in slots `i` and `j`.
    #[inline(always)]
    pub fn swap(&mut self, i: u32, j: u32) {
        self.data.swap(1 + i as usize, 1 + j as usize);
    }

    #[inline(always)]
    pub fn lits(&self) -> &[Lit] {
        let sz = self.size() as usize;
        // same layout argument as `ClauseRef::lits`
        unsafe { slice::from_raw_parts(self.data[1..].as_ptr() as *const Lit, sz) }
    }

    pub fn activity(&self) -> f32 {
        debug_assert!(self.learnt());
        f32::from_bits(self.data[1 + self.size() as usize])
    }

    pub fn set_activity(&mut self, activity: f32) {
        debug_assert!(self.learnt());
        let idx = 1 + self.size() as usize;
        self.data[idx] = activity.to_bits();
    }

    pub fn set_lbd(&mut self, lbd: u32) {
        debug_assert!(self.learnt());
        let idx = 2 + self.size() as usize;
        self.data[idx] = lbd;
    }

    /// Where this clause moved during relocation.
    pub fn relocation(&self) -> CRef {
        debug_assert!(self.reloced());
        CRef(self.data[1])
    }

    pub fn relocate(mut self, c: CRef) {
        debug_assert!(!self.reloced());
        self.set_reloced(true);
        self.data[1] = c.0;
    }

    /// Drop literals beyond `new_size`, keeping the first two slots (they are
    /// the registered watches).
    pub fn shrink(mut self, new_size: u32) {
        debug_assert!(2 <= new_size);
        debug_assert!(new_size <= self.size());
        let old_size = self.size();
        if new_size < old_size {
            if self.learnt() {
                let act = self.data[1 + old_size as usize];
                let lbd = self.data[2 + old_size as usize];
                self.data[1 + new_size as usize] = act;
                self.data[2 + new_size as usize] = lbd;
            }
            let mut h = self.header();
            h.set_size(new_size);
            self.set_header(h);
        }
    }

    pub fn as_clause_ref(&self) -> ClauseRef {
        ClauseRef {
            header: self.header(),
            data: &self.data[1..],
        }
    }
}

impl<'a> ops::Index<u32> for ClauseMut<'a> {
    type Output = Lit;
    #[inline(always)]
    fn index(&self, index: u32) -> &Self::Output {
        &self.lits()[index as usize]
    }
}

/// Arena holding every clause of the solver as a flat sequence of words.
///
/// Watch lists and reason slots refer to clauses by [`CRef`] only; there is
/// exactly one copy of each clause in the whole solver.
#[derive(Debug)]
pub struct ClauseAllocator {
    data: Vec<u32>,
    wasted: u32,
}

impl ClauseAllocator {
    /// Bytes per arena word, for GC reporting.
    pub const UNIT_SIZE: u32 = 4;

    pub fn with_start_cap(start_cap: u32) -> Self {
        Self {
            data: Vec::with_capacity(start_cap as usize),
            wasted: 0,
        }
    }

    pub fn new() -> Self {
        Self::with_start_cap(1024 * 1024)
    }

    #[inline(always)]
    pub fn len(&self) -> u32 {
        self.data.len() as u32
    }

    pub fn wasted(&self) -> u32 {
        self.wasted
    }

    fn slots_for(header: ClauseHeader) -> u32 {
        1 + header.size() + if header.learnt() { LEARNT_EXTRA } else { 0 }
    }

    pub(crate) fn alloc(&mut self, clause: &[Lit], learnt: bool) -> CRef {
        let cr = CRef(self.data.len() as u32);
        let header = ClauseHeader::new(learnt, clause.len() as u32);
        self.data.push(header.0);
        for &lit in clause {
            self.data.push(lit.idx());
        }
        if learnt {
            self.data.push(0f32.to_bits()); // activity
            self.data.push(0); // lbd
        }
        cr
    }

    pub(crate) fn alloc_copy(&mut self, from: ClauseRef) -> CRef {
        let cr = CRef(self.data.len() as u32);
        self.data.push(from.header.0);
        self.data.extend_from_slice(from.raw_data());
        cr
    }

    pub(crate) fn free(&mut self, cr: CRef) {
        let slots = {
            let c = self.get_mut(cr);
            Self::slots_for(c.header())
        };
        self.wasted += slots;
    }

    pub fn free_amount(&mut self, size: u32) {
        self.wasted += size;
    }

    /// Relocate clause `cr` into allocator `to`.
    ///
    /// Post-condition: `*cr` contains the index of the copy in `to`.
    pub(crate) fn reloc(&mut self, cr: &mut CRef, to: &mut ClauseAllocator) {
        let c = self.get_mut(*cr);
        if c.reloced() {
            *cr = c.relocation();
            return;
        }
        *cr = to.alloc_copy(c.as_clause_ref());
        c.relocate(*cr);
    }

    pub(crate) fn get_ref(&self, cr: CRef) -> ClauseRef {
        let base = cr.0 as usize;
        let header = ClauseHeader(self.data[base]);
        let len = Self::slots_for(header) as usize - 1;
        ClauseRef {
            header,
            data: &self.data[base + 1..base + 1 + len],
        }
    }

    pub(crate) fn get_mut(&mut self, cr: CRef) -> ClauseMut {
        let base = cr.0 as usize;
        let header = ClauseHeader(self.data[base]);
        let len = Self::slots_for(header) as usize;
        ClauseMut {
            data: &mut self.data[base..base + len],
        }
    }
}

impl Default for ClauseAllocator {
    fn default() -> Self {
        ClauseAllocator::new()
    }
}

/// Generic interface for objects printable in DIMACS
pub mod display {
    use super::*;

    /// Objects that can be printed in DIMACS syntax
    pub trait Print: Sized {
        fn fmt_dimacs(&self, out: &mut fmt::Formatter) -> fmt::Result;

        /// Any type implementing `Print` can be used in a format string by
        /// just using `x.pp_dimacs()` instead of `x`.
        fn pp_dimacs(&self) -> PrintWrapper<Self> {
            PrintWrapper(self)
        }
    }

    /// A wrapper that can be used to display objects in format strings
    pub struct PrintWrapper<'a, T: 'a + Print>(&'a T);

    impl<'a, T: Print> fmt::Display for PrintWrapper<'a, T> {
        fn fmt(&self, out: &mut fmt::Formatter) -> fmt::Result {
            self.0.fmt_dimacs(out)
        }
    }

    fn fmt_lits(lits: &[Lit], out: &mut fmt::Formatter) -> fmt::Result {
        for &lit in lits {
            write!(
                out,
                "{}{} ",
                (if lit.sign() { "" } else { "-" }),
                lit.var().idx() + 1
            )?;
        }
        write!(out, "0")
    }

    impl<'a> Print for &'a [Lit] {
        fn fmt_dimacs(&self, out: &mut fmt::Formatter) -> fmt::Result {
            fmt_lits(self, out)
        }
    }

    impl Print for Vec<Lit> {
        fn fmt_dimacs(&self, out: &mut fmt::Formatter) -> fmt::Result {
            fmt_lits(self, out)
        }
    }

    impl<'a> Print for ClauseRef<'a> {
        fn fmt_dimacs(&self, out: &mut fmt::Formatter) -> fmt::Result {
            fmt_lits(self.lits(), out)
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_lit_encoding() {
        let v = Var::from_idx(3);
        let p = Lit::new(v, true);
        let n = Lit::new(v, false);
        assert_eq!(p.idx(), 6);
        assert_eq!(n.idx(), 7);
        assert_eq!(!p, n);
        assert_eq!(p.var(), n.var());
        assert!(p.sign());
        assert!(!n.sign());
        assert_eq!(p ^ true, n);
        assert_eq!(p.apply_sign(false), n);
    }

    #[test]
    fn test_lbool_eq() {
        for i in 0..4 {
            let a = lbool::from_u8(i);
            for j in 0..4 {
                let b = lbool::from_u8(j);
                let are_eq = (i == 0 && j == 0) || (i == 1 && j == 1) || (i >= 2 && j >= 2);
                assert_eq!(are_eq, a == b, "{:?}[{}] == {:?}[{}]", a, i, b, j);
            }
        }
    }

    #[test]
    fn test_lbool_ops() {
        assert_eq!(-lbool::TRUE, lbool::FALSE);
        assert_eq!(-lbool::FALSE, lbool::TRUE);
        assert_eq!(-lbool::UNDEF, lbool::UNDEF);
        assert_eq!(lbool::TRUE ^ true, lbool::FALSE);
        assert_eq!(lbool::FALSE ^ true, lbool::TRUE);
        assert_eq!(lbool::UNDEF ^ true, lbool::UNDEF);
        assert_eq!(lbool::UNDEF ^ false, lbool::UNDEF);
    }

    #[test]
    fn test_header_roundtrip() {
        let mut h = ClauseHeader::new(true, 17);
        assert!(h.learnt());
        assert_eq!(h.size(), 17);
        assert_eq!(h.mark(), 0);
        assert!(!h.reloced());
        h.set_mark(1);
        h.set_size(3);
        assert_eq!(h.mark(), 1);
        assert_eq!(h.size(), 3);
        assert!(h.learnt());
    }

    fn lits_of(ints: &[i32]) -> Vec<Lit> {
        ints.iter()
            .map(|&i| Lit::new(Var::from_idx((i.abs() - 1) as u32), i > 0))
            .collect()
    }

    #[test]
    fn test_alloc_roundtrip() {
        let mut ca = ClauseAllocator::new();
        let lits = lits_of(&[1, -2, 3]);
        let cr = ca.alloc(&lits, true);
        {
            let mut c = ca.get_mut(cr);
            c.set_activity(2.5);
            c.set_lbd(2);
        }
        let c = ca.get_ref(cr);
        assert!(c.learnt());
        assert_eq!(c.size(), 3);
        assert_eq!(c.lits(), &lits[..]);
        assert_eq!(c.activity(), 2.5);
        assert_eq!(c.lbd(), 2);
    }

    #[test]
    fn test_shrink_keeps_extras() {
        let mut ca = ClauseAllocator::new();
        let lits = lits_of(&[1, -2, 3, 4]);
        let cr = ca.alloc(&lits, true);
        {
            let mut c = ca.get_mut(cr);
            c.set_activity(1.0);
            c.set_lbd(3);
        }
        ca.get_mut(cr).shrink(2);
        let c = ca.get_ref(cr);
        assert_eq!(c.size(), 2);
        assert_eq!(c.lits(), &lits[..2]);
        assert_eq!(c.activity(), 1.0);
        assert_eq!(c.lbd(), 3);
    }
}
