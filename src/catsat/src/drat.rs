//! DRAT proofs.
//!
//! The recorder stores clause additions and deletions as a flat stream of
//! DIMACS integers and can render them either as textual DRAT
//! (`lits... 0\n`, deletions prefixed with `d`) or as binary DRAT (`a`/`d`
//! prefix bytes, literals as 7-bit variable-length integers). A trailing
//! empty clause is emitted so that an UNSAT run forms a complete refutation.

use {
    crate::clause::Lit,
    std::{fmt, io},
};

/// Marker in the integer stream introducing a deletion step.
const DELETE: i32 = i32::MAX;

/// A recorded DRAT proof.
#[derive(Debug, Clone, Default)]
pub struct Proof(Vec<i32>);

impl Proof {
    /// New proof recording structure.
    pub fn new() -> Self {
        Proof(Vec::new())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    fn push_lit(&mut self, lit: Lit) {
        let i: i32 = (if lit.sign() { 1 } else { -1 }) * ((lit.var().idx() + 1) as i32);
        self.0.push(i)
    }

    /// Register clause creation.
    pub fn create_clause(&mut self, c: &[Lit]) {
        for &lit in c {
            self.push_lit(lit);
        }
        self.0.push(0);
    }

    /// Register clause deletion.
    pub fn delete_clause(&mut self, c: &[Lit]) {
        self.0.push(DELETE);
        for &lit in c {
            self.push_lit(lit);
        }
        self.0.push(0);
    }

    /// Write the proof in textual DRAT.
    pub fn write_text<W: io::Write>(&self, out: &mut W) -> io::Result<()> {
        write!(out, "{}", self)
    }

    /// Write the proof in binary DRAT: each step is `a` or `d`, then every
    /// literal as an unsigned `2*var + neg` + 2 in 7-bit little-endian
    /// chunks with a continuation bit, then a `0` byte.
    pub fn write_binary<W: io::Write>(&self, out: &mut W) -> io::Result<()> {
        let mut at_start = true;
        for &i in &self.0 {
            if at_start {
                at_start = false;
                if i == DELETE {
                    out.write_all(b"d")?;
                    continue;
                }
                out.write_all(b"a")?;
            }
            if i == 0 {
                out.write_all(&[0])?;
                at_start = true;
            } else {
                write_vli(out, mapped_lit(i))?;
            }
        }
        // final empty clause
        out.write_all(b"a\x00")?;
        Ok(())
    }
}

/// DRAT binary literal mapping: positive `l` -> `2l`, negative -> `2|l|+1`.
fn mapped_lit(i: i32) -> u64 {
    debug_assert_ne!(i, 0);
    if i > 0 {
        2 * i as u64
    } else {
        2 * (-i) as u64 + 1
    }
}

fn write_vli<W: io::Write>(out: &mut W, mut x: u64) -> io::Result<()> {
    loop {
        let chunk = (x & 0x7f) as u8;
        x >>= 7;
        if x == 0 {
            return out.write_all(&[chunk]);
        }
        out.write_all(&[chunk | 0x80])?;
    }
}

impl fmt::Display for Proof {
    fn fmt(&self, out: &mut fmt::Formatter) -> fmt::Result {
        let mut at_start = true;
        for &i in &self.0 {
            if at_start && i == DELETE {
                write!(out, "d")?;
                continue;
            }
            at_start = false;
            if i == 0 {
                writeln!(out, " 0")?;
                at_start = true;
            } else {
                write!(out, " {}", i)?;
            }
        }
        // final empty clause
        writeln!(out, "0")
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::clause::Var;

    fn lit(i: i32) -> Lit {
        Lit::new(Var::from_idx((i.abs() - 1) as u32), i > 0)
    }

    #[test]
    fn test_text_form() {
        let mut p = Proof::new();
        p.create_clause(&[lit(1), lit(-2)]);
        p.delete_clause(&[lit(2)]);
        let s = p.to_string();
        assert_eq!(s, " 1 -2 0\nd 2 0\n0\n");
    }

    #[test]
    fn test_binary_form() {
        let mut p = Proof::new();
        p.create_clause(&[lit(1), lit(-2)]);
        p.delete_clause(&[lit(2)]);
        let mut buf = vec![];
        p.write_binary(&mut buf).unwrap();
        // a, 2*1, 2*2+1, 0, d, 2*2, 0, a, 0
        assert_eq!(buf, vec![b'a', 2, 5, 0, b'd', 4, 0, b'a', 0]);
    }

    #[test]
    fn test_vli_continuation() {
        let mut buf = vec![];
        write_vli(&mut buf, 0x2a3).unwrap();
        assert_eq!(buf, vec![0xa3, 0x05]);
    }
}
