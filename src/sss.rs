//! Shamir Secret Sharing over GF(2^8), byte-wise.
//!
//! Secrets are arbitrary byte strings. Before splitting, the secret's
//! bitstream is framed: a single 1 bit is prepended (so leading zero bytes
//! survive reconstruction) and the stream is right-padded with zeros to a
//! byte boundary. Each framed byte is one GF(2^8) polynomial evaluation.
//!
//! ## Share wire format (L-byte secret → L + 2 bytes)
//!
//! | Field | Offset | Size  | Description                                   |
//! |-------|--------|-------|-----------------------------------------------|
//! | x     | 0      | 1     | evaluation point (1..=n)                      |
//! | y     | 1      | L + 1 | chunk evaluations, reverse chunk order        |
//!
//! The y bytes are packed chunk-wise reversed: the framed chunk carrying
//! the marker bit is the *last* emitted byte. `combine` restores the chunk
//! order, interpolates each chunk at x = 0 and strips bits up to and
//! including the first set bit.

use anyhow::{bail, Result};
use rand::{CryptoRng, RngCore};
use zeroize::Zeroize;

/// Split `secret` into `n` shares with threshold `k`.
///
/// Shares are evaluated at sequential x values 1..=n. The polynomial
/// coefficients come from `rng`, which must be cryptographically strong;
/// the build passes a salt-seeded CSPRNG so rebuilds are byte-identical.
pub fn split<R: RngCore + CryptoRng>(
    secret: &[u8],
    k: u8,
    n: u8,
    rng: &mut R,
) -> Result<Vec<Vec<u8>>> {
    if k < 2 {
        bail!("threshold must be >= 2");
    }
    if n < 2 {
        bail!("share count must be >= 2");
    }
    if n < k {
        bail!("shares ({n}) must be >= threshold ({k})");
    }
    if secret.is_empty() {
        bail!("secret must not be empty");
    }

    let chunks = frame(secret);
    let kt = k as usize;

    // coeffs[j][0] = framed chunk j, coeffs[j][1..k] = random.
    let mut coeffs = vec![vec![0u8; kt]; chunks.len()];
    for (j, &c) in chunks.iter().enumerate() {
        coeffs[j][0] = c;
        for d in 1..kt {
            coeffs[j][d] = (rng.next_u32() & 0xff) as u8;
        }
    }

    let mut out = Vec::with_capacity(n as usize);
    for x in 1..=n {
        let mut share = Vec::with_capacity(1 + chunks.len());
        share.push(x);
        for j in (0..chunks.len()).rev() {
            share.push(eval_poly(&coeffs[j], x));
        }
        out.push(share);
    }

    for c in &mut coeffs {
        c.zeroize();
    }

    Ok(out)
}

/// Reconstruct the secret from `k` or more shares via Lagrange
/// interpolation at x = 0. Only the first `k` shares are used; duplicate
/// or zero x values and length mismatches are rejected.
pub fn combine(shares: &[Vec<u8>], k: u8) -> Result<Vec<u8>> {
    if k < 2 {
        bail!("invalid threshold");
    }
    if shares.len() < k as usize {
        bail!("need at least {k} shares, have {}", shares.len());
    }

    let used = &shares[..k as usize];
    let y_len = used[0].len().saturating_sub(1);
    if y_len == 0 {
        bail!("share too short");
    }
    for s in used {
        if s.len() != y_len + 1 {
            bail!("share length mismatch");
        }
    }
    for i in 0..used.len() {
        if used[i][0] == 0 {
            bail!("invalid share x=0");
        }
        for j in (i + 1)..used.len() {
            if used[i][0] == used[j][0] {
                bail!("duplicate share x={}", used[i][0]);
            }
        }
    }

    // Emitted y position t holds chunk y_len - 1 - t.
    let mut chunks = vec![0u8; y_len];
    for t in 0..y_len {
        let points: Vec<(u8, u8)> = used.iter().map(|s| (s[0], s[1 + t])).collect();
        chunks[y_len - 1 - t] = interpolate_at_zero(&points);
    }

    let secret = unframe(&chunks)?;
    chunks.zeroize();
    Ok(secret)
}

// ---------------------------------------------------------------------------
// Bitstream framing
// ---------------------------------------------------------------------------

/// Prepend a 1 bit to the secret's bitstream and right-pad with zeros to a
/// byte boundary, yielding `len + 1` chunk bytes.
fn frame(secret: &[u8]) -> Vec<u8> {
    let mut chunks = vec![0u8; secret.len() + 1];
    chunks[0] = 0x80;
    for (i, &b) in secret.iter().enumerate() {
        chunks[i] |= b >> 1;
        chunks[i + 1] = b << 7;
    }
    chunks
}

/// Inverse of [`frame`]: strip bits up to and including the first set bit,
/// then reassemble whole bytes (the trailing partial byte is padding).
fn unframe(chunks: &[u8]) -> Result<Vec<u8>> {
    let marker = chunks
        .iter()
        .enumerate()
        .find(|(_, &b)| b != 0)
        .map(|(i, &b)| i * 8 + b.leading_zeros() as usize);
    let Some(p) = marker else {
        bail!("corrupt share data: marker bit not found");
    };

    let total_bits = chunks.len() * 8;
    let n = (total_bits - p - 1) / 8;
    let mut out = vec![0u8; n];
    for (i, byte) in out.iter_mut().enumerate() {
        for bit in 0..8 {
            let idx = p + 1 + i * 8 + bit;
            if chunks[idx / 8] & (0x80 >> (idx % 8)) != 0 {
                *byte |= 0x80 >> bit;
            }
        }
    }
    Ok(out)
}

// ---------------------------------------------------------------------------
// Polynomial arithmetic
// ---------------------------------------------------------------------------

/// Evaluate the polynomial at point x using Horner's method.
fn eval_poly(coeffs: &[u8], x: u8) -> u8 {
    let mut acc = *coeffs.last().unwrap();
    for &c in coeffs.iter().rev().skip(1) {
        acc = crate::gf256::add(crate::gf256::mul(acc, x), c);
    }
    acc
}

/// Lagrange interpolation at x = 0.
fn interpolate_at_zero(points: &[(u8, u8)]) -> u8 {
    let mut acc = 0u8;
    for (i, &(xi, yi)) in points.iter().enumerate() {
        let mut num = 1u8;
        let mut den = 1u8;
        for (j, &(xj, _)) in points.iter().enumerate() {
            if i == j {
                continue;
            }
            num = crate::gf256::mul(num, xj);
            den = crate::gf256::mul(den, crate::gf256::add(xi, xj)); // sub = add
        }
        let li = crate::gf256::div(num, den);
        acc = crate::gf256::add(acc, crate::gf256::mul(yi, li));
    }
    acc
}
