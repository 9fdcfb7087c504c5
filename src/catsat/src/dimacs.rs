/*****************************************************************************************[dimacs.rs]
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
    crate::{
        interface::SolverInterface,
        {lbool, Lit},
    },
    std::io::{self, BufRead},
    thiserror::Error,
};

/// Failure to parse a DIMACS problem.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("PARSE ERROR! line {line}: {msg}")]
    Syntax { line: usize, msg: String },
}

/// `parse(input, solver, ...)` adds the content of `input` to the solver.
///
/// ## Params
/// - `is_strict`: fail if the number of clauses does not match the header
/// - `incremental`: accept the [.icnf format](http://www.siert.nl/icnf/),
///   whose `a` lines trigger a solve under assumptions
pub fn parse<S: SolverInterface, R: BufRead>(
    input: &mut R,
    solver: &mut S,
    is_strict: bool,
    incremental: bool,
) -> Result<(), ParseError> {
    let mut input = Scanner::new(input);
    let mut lits = vec![];
    let mut num_clauses = 0;
    let mut num_read_clauses = 0;
    loop {
        input.skip_whitespace()?;
        match input.peek()? {
            Some(b'p') => {
                if incremental {
                    input.skip_line()?;
                    continue;
                }
                let mut header = [0; 5];
                input.read_exact(&mut header)?;
                if &header != b"p cnf" {
                    return Err(input.syntax_error("expected `p cnf <vars> <clauses>` header"));
                }
                let _num_vars = input.parse_int()?;
                num_clauses = input.parse_int()?;
            }
            Some(b'c') => input.skip_line()?,
            Some(b'a') if incremental => {
                input.consume();
                read_clause(&mut input, solver, &mut lits)?;
                debug!("solve with assumptions {:?} (ok: {})", &lits, solver.is_ok());
                solver.simplify();
                let res = solver.solve_limited(&lits); // solve under assumptions
                if res == lbool::TRUE {
                    println!("SAT");
                } else if res == lbool::FALSE {
                    println!("UNSAT");
                } else {
                    println!("UNKNOWN");
                }
            }
            Some(_) => {
                read_clause(&mut input, solver, &mut lits)?;
                solver.add_clause_reuse(&mut lits);
                num_read_clauses += 1;
            }
            None => break,
        }
    }
    if is_strict && !incremental && num_clauses != num_read_clauses {
        return Err(input.syntax_error("DIMACS header mismatch: wrong number of clauses"));
    }
    Ok(())
}

/// One clause: signed integers up to a terminating `0`.
fn read_clause<S: SolverInterface, R: BufRead>(
    input: &mut Scanner<R>,
    solver: &mut S,
    lits: &mut Vec<Lit>,
) -> Result<(), ParseError> {
    lits.clear();
    loop {
        let parsed_lit = input.parse_int()?;
        if parsed_lit == 0 {
            return Ok(());
        }
        let var = solver.var_of_int(parsed_lit.unsigned_abs() - 1);
        lits.push(Lit::new(var, parsed_lit > 0));
    }
}

/// Byte-level scanner keeping track of the current line for error messages.
struct Scanner<'a, R: BufRead> {
    input: &'a mut R,
    line: usize,
}

impl<'a, R: BufRead> Scanner<'a, R> {
    fn new(input: &'a mut R) -> Self {
        Self { input, line: 1 }
    }

    fn syntax_error(&self, msg: impl Into<String>) -> ParseError {
        ParseError::Syntax {
            line: self.line,
            msg: msg.into(),
        }
    }

    fn peek(&mut self) -> io::Result<Option<u8>> {
        Ok(self.input.fill_buf()?.first().copied())
    }

    fn consume(&mut self) {
        if let Ok(buf) = self.input.fill_buf() {
            if buf.first() == Some(&b'\n') {
                self.line += 1;
            }
        }
        self.input.consume(1);
    }

    fn read_exact(&mut self, buf: &mut [u8]) -> io::Result<()> {
        self.input.read_exact(buf)
    }

    fn skip_whitespace(&mut self) -> io::Result<()> {
        while let Some(ch) = self.peek()? {
            if !(b'\x09'..=b'\x0d').contains(&ch) && ch != b' ' {
                break;
            }
            self.consume();
        }
        Ok(())
    }

    fn skip_line(&mut self) -> io::Result<()> {
        while let Some(ch) = self.peek()? {
            self.consume();
            if ch == b'\n' {
                break;
            }
        }
        Ok(())
    }

    fn parse_int(&mut self) -> Result<i32, ParseError> {
        self.skip_whitespace()?;
        let neg = match self.peek()? {
            Some(b'+') | Some(b'-') => {
                let n = self.peek()? == Some(b'-');
                self.consume();
                n
            }
            _ => false,
        };
        match self.peek()? {
            Some(ch) if ch.is_ascii_digit() => (),
            Some(ch) => {
                return Err(
                    self.syntax_error(format!("expected a digit, got `{}`", ch as char))
                )
            }
            None => return Err(self.syntax_error("expected a digit, got end of input")),
        }
        let mut val: i32 = 0;
        while let Some(ch) = self.peek()? {
            if !ch.is_ascii_digit() {
                break;
            }
            self.consume();
            val = val * 10 + (ch - b'0') as i32;
        }
        Ok(if neg { -val } else { val })
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{BasicSolver, SolverInterface};
    use std::io::BufReader;

    fn parse_str(s: &str) -> Result<BasicSolver, ParseError> {
        let mut solver = BasicSolver::default();
        let mut input = BufReader::new(s.as_bytes());
        parse(&mut input, &mut solver, false, false)?;
        Ok(solver)
    }

    #[test]
    fn test_parse_simple() {
        let s = parse_str("c comment\np cnf 2 2\n1 -2 0\n2 0\n").unwrap();
        assert_eq!(s.num_vars(), 2);
        assert_eq!(s.num_clauses(), 1); // `2 0` became a unit assertion
    }

    #[test]
    fn test_parse_reports_line() {
        let err = parse_str("p cnf 1 1\nc fine so far\n1 x 0\n").unwrap_err();
        match err {
            ParseError::Syntax { line, ref msg } => {
                assert_eq!(line, 3);
                assert!(msg.contains('x'), "unexpected message: {}", msg);
            }
            other => panic!("expected syntax error, got {:?}", other),
        }
    }

    #[test]
    fn test_strict_clause_count() {
        let mut solver = BasicSolver::default();
        let mut input = BufReader::new("p cnf 2 3\n1 2 0\n".as_bytes());
        let err = parse(&mut input, &mut solver, true, false).unwrap_err();
        assert!(matches!(err, ParseError::Syntax { .. }));
    }

    #[test]
    fn test_solve_parsed() {
        let mut s = parse_str("p cnf 2 3\n-1 2 0\n1 2 0\n-1 -2 0\n").unwrap();
        assert_eq!(s.solve_limited(&[]), crate::lbool::TRUE);
        let model = s.get_model();
        assert_eq!(model[0], crate::lbool::FALSE);
        assert_eq!(model[1], crate::lbool::TRUE);
    }
}
