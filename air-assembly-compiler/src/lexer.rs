// SPDX-License-Identifier: AGPL-3.0-or-later
// This file is part of air-assembly project.
// Copyright (C) 2025  Andrei Kochergin <zeek@tuta.com>
//
// Additional terms under GNU AGPL v3 section 7:
//   You must preserve this notice and the air-assembly
//   attribution in copies of this file or substantial
//   portions of it. See the NOTICE file for details.

//! Tokenizer for AirAssembly source text.

use crate::error::{Error, Position};

const MAX_TOKENS: usize = 1_000_000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Tok {
    LParen,
    RParen,
    Int(u128),
    Hex(Vec<u8>),
    Sym(String),
    Eof,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub tok: Tok,
    pub pos: Position,
}

struct Cursor<I: Iterator<Item = char>> {
    it: std::iter::Peekable<I>,
    line: u32,
    column: u32,
}

impl<I: Iterator<Item = char>> Cursor<I> {
    fn peek(&mut self) -> Option<char> {
        self.it.peek().copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.it.next()?;
        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }

        Some(c)
    }

    fn pos(&self) -> Position {
        Position::new(self.line, self.column)
    }

    fn take_while(&mut self, pred: impl Fn(char) -> bool) -> String {
        let mut s = String::new();
        while let Some(c) = self.peek() {
            if !pred(c) {
                break;
            }

            s.push(c);
            self.bump();
        }

        s
    }
}

pub fn lex(src: &str) -> Result<Vec<Token>, Error> {
    let mut out = Vec::new();
    let mut cur = Cursor {
        it: src.chars().peekable(),
        line: 1,
        column: 1,
    };

    while let Some(ch) = cur.peek() {
        let pos = cur.pos();
        match ch {
            '(' => {
                cur.bump();
                out.push(Token {
                    tok: Tok::LParen,
                    pos,
                });
            }
            ')' => {
                cur.bump();
                out.push(Token {
                    tok: Tok::RParen,
                    pos,
                });
            }
            ';' => {
                // line comment
                cur.take_while(|c| c != '\n');
            }
            c if c.is_whitespace() => {
                cur.bump();
            }
            '0'..='9' => {
                let s = cur.take_while(is_sym_continue);
                let tok = lex_number(&s, pos)?;
                out.push(Token { tok, pos });
            }
            _ => {
                if !is_sym_start(ch) {
                    return Err(Error::Lex {
                        message: format!("invalid char '{ch}'"),
                        pos,
                    });
                }

                let s = cur.take_while(is_sym_continue);
                out.push(Token {
                    tok: Tok::Sym(s),
                    pos,
                });
            }
        }

        if out.len() > MAX_TOKENS {
            return Err(Error::Lex {
                message: "too many tokens".to_string(),
                pos,
            });
        }
    }

    out.push(Token {
        tok: Tok::Eof,
        pos: cur.pos(),
    });

    Ok(out)
}

fn lex_number(s: &str, pos: Position) -> Result<Tok, Error> {
    if let Some(digits) = s.strip_prefix("0x") {
        return parse_hex(digits).map(Tok::Hex).ok_or_else(|| Error::Lex {
            message: format!("malformed hex literal '{s}'"),
            pos,
        });
    }

    s.parse::<u128>().map(Tok::Int).map_err(|_| Error::Lex {
        message: format!("malformed integer '{s}'"),
        pos,
    })
}

/// Odd digit counts get a leading zero nibble.
fn parse_hex(digits: &str) -> Option<Vec<u8>> {
    if digits.is_empty() {
        return None;
    }

    let padded = if digits.len() % 2 == 1 { format!("0{digits}") } else { digits.to_owned() };
    hex::decode(padded).ok()
}

pub fn is_sym_start(c: char) -> bool {
    matches!(c, 'a'..='z' | 'A'..='Z' | '_' | '$')
}

pub fn is_sym_continue(c: char) -> bool {
    is_sym_start(c) || matches!(c, '0'..='9' | '.' | '-')
}

#[cfg(test)]
mod tests {
    use super::*;

    fn toks(src: &str) -> Vec<Tok> {
        lex(src).unwrap().into_iter().map(|t| t.tok).collect()
    }

    #[test]
    fn lex_ignores_line_comments() {
        let s = "(field prime 7)\n; comment here\n(const scalar 1)";
        let s_no = "(field prime 7)(const scalar 1)";

        assert_eq!(toks(s), toks(s_no));
    }

    #[test]
    fn lex_dotted_symbols_and_big_ints() {
        let t = toks("(load.trace 0) 340282366920938463463374607393113505793");
        assert_eq!(t[1], Tok::Sym("load.trace".into()));
        assert_eq!(t[4], Tok::Int(340282366920938463463374607393113505793));
    }

    #[test]
    fn lex_hex_seed() {
        let t = toks("0x4d6943");
        assert_eq!(t[0], Tok::Hex(vec![0x4d, 0x69, 0x43]));

        let odd = toks("0xabc");
        assert_eq!(odd[0], Tok::Hex(vec![0x0a, 0xbc]));
    }

    #[test]
    fn lex_rejects_malformed_hex() {
        for src in ["0x", "0xfg", "0x12z"] {
            let err = lex(src).unwrap_err();
            assert!(err.to_string().contains("malformed hex literal"), "{src}");
        }
    }

    #[test]
    fn lex_reports_position() {
        let err = lex("(module\n  (field # 1))").unwrap_err();
        match err {
            Error::Lex { pos, .. } => assert_eq!(pos, Position::new(2, 10)),
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn lex_rejects_overflowing_integer() {
        let err = lex("999999999999999999999999999999999999999999").unwrap_err();
        assert!(err.to_string().contains("malformed integer"));
    }
}
