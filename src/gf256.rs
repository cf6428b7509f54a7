//! GF(2^8) arithmetic for Shamir secret sharing.
//!
//! The field is generated by the primitive polynomial
//! x^8 + x^4 + x^3 + x^2 + 1 (0x11d, low bits 29). Multiplication and
//! division go through exp/log tables: `exps[i] = g^i` for the generator
//! g = 2, `logs[g^i] = i`. The tables are built once on first use.

use std::sync::OnceLock;

/// Low bits of the reduction polynomial (x^8 + x^4 + x^3 + x^2 + 1, sans x^8).
const POLY: u16 = 29;

/// Multiplicative group order: every non-zero element is g^i for i < 255.
const ORDER: u16 = 255;

struct Tables {
    exps: [u8; 256],
    logs: [u8; 256],
}

fn tables() -> &'static Tables {
    static TABLES: OnceLock<Tables> = OnceLock::new();
    TABLES.get_or_init(|| {
        let mut exps = [0u8; 256];
        let mut logs = [0u8; 256];
        let mut v: u16 = 1;
        for i in 0..256 {
            exps[i] = v as u8;
            if i < ORDER as usize {
                logs[v as usize] = i as u8;
            }
            v <<= 1;
            if v > 255 {
                v ^= 256 | POLY;
            }
        }
        Tables { exps, logs }
    })
}

/// Addition and subtraction coincide in GF(2^n).
#[inline]
pub fn add(a: u8, b: u8) -> u8 {
    a ^ b
}

/// Field multiplication via log/exp lookup.
pub fn mul(a: u8, b: u8) -> u8 {
    if a == 0 || b == 0 {
        return 0;
    }
    let t = tables();
    let i = t.logs[a as usize] as u16 + t.logs[b as usize] as u16;
    t.exps[(i % ORDER) as usize]
}

/// Field division. The caller must ensure `b != 0`; Shamir interpolation
/// only divides by products of distinct non-zero x coordinates.
pub fn div(a: u8, b: u8) -> u8 {
    debug_assert!(b != 0, "division by zero in GF(2^8)");
    if a == 0 {
        return 0;
    }
    let t = tables();
    let i = t.logs[a as usize] as u16 + ORDER - t.logs[b as usize] as u16;
    t.exps[(i % ORDER) as usize]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_anchors() {
        let t = tables();
        assert_eq!(t.exps[0], 1);
        assert_eq!(t.exps[8], 29); // 2^8 reduces to the polynomial's low bits
        assert_eq!(t.exps[255], 1); // the generator has order 255
    }

    #[test]
    fn log_inverts_exp() {
        let t = tables();
        for i in 0..255u16 {
            assert_eq!(t.logs[t.exps[i as usize] as usize], i as u8);
        }
    }

    #[test]
    fn mul_identity_and_zero() {
        for a in 0..=255u8 {
            assert_eq!(mul(a, 1), a);
            assert_eq!(mul(1, a), a);
            assert_eq!(mul(a, 0), 0);
            assert_eq!(mul(0, a), 0);
        }
    }

    #[test]
    fn mul_commutes() {
        for a in [1u8, 2, 29, 53, 128, 200, 255] {
            for b in [1u8, 3, 29, 77, 128, 254] {
                assert_eq!(mul(a, b), mul(b, a));
            }
        }
    }

    #[test]
    fn div_inverts_mul() {
        for a in 1..=255u8 {
            for b in [1u8, 2, 29, 100, 255] {
                assert_eq!(div(mul(a, b), b), a);
            }
        }
    }
}
