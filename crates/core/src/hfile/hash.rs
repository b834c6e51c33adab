/*
 * Licensed to the Apache Software Foundation (ASF) under one
 * or more contributor license agreements.  See the NOTICE file
 * distributed with this work for additional information
 * regarding copyright ownership.  The ASF licenses this file
 * to you under the Apache License, Version 2.0 (the
 * "License"); you may not use this file except in compliance
 * with the License.  You may obtain a copy of the License at
 *
 *   http://www.apache.org/licenses/LICENSE-2.0
 *
 * Unless required by applicable law or agreed to in writing,
 * software distributed under the License is distributed on an
 * "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
 * KIND, either express or implied.  See the License for the
 * specific language governing permissions and limitations
 * under the License.
 */
//! Hash functions used by bloom filters, bit-compatible with HBase.

use crate::hfile::error::{HFileError, Result};

/// Hash function recorded in the bloom filter metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::Display)]
pub enum BloomHashType {
    Jenkins = 0,
    Murmur = 1,
    Murmur3 = 2,
}

impl BloomHashType {
    pub fn from_id(id: i32) -> Result<Self> {
        match id {
            0 => Ok(BloomHashType::Jenkins),
            1 => Ok(BloomHashType::Murmur),
            2 => Ok(BloomHashType::Murmur3),
            _ => Err(HFileError::UnsupportedHash(id)),
        }
    }

    pub fn id(&self) -> i32 {
        *self as i32
    }

    pub fn hash(&self, key: &[u8], seed: i32) -> i32 {
        let seed = seed as u32;
        let h = match self {
            BloomHashType::Jenkins => jenkins_hash(key, seed),
            BloomHashType::Murmur => murmur_hash2(key, seed),
            BloomHashType::Murmur3 => murmur_hash3(key, seed),
        };
        h as i32
    }
}

fn le_u32(bytes: &[u8]) -> u32 {
    bytes
        .iter()
        .enumerate()
        .fold(0u32, |acc, (i, b)| acc | (*b as u32) << (8 * i))
}

/// Bob Jenkins' lookup3 `hashlittle`.
fn jenkins_hash(key: &[u8], seed: u32) -> u32 {
    let init = 0xdead_beefu32
        .wrapping_add(key.len() as u32)
        .wrapping_add(seed);
    let (mut a, mut b, mut c) = (init, init, init);

    let mut rest = key;
    while rest.len() > 12 {
        a = a.wrapping_add(le_u32(&rest[0..4]));
        b = b.wrapping_add(le_u32(&rest[4..8]));
        c = c.wrapping_add(le_u32(&rest[8..12]));

        a = a.wrapping_sub(c);
        a ^= c.rotate_left(4);
        c = c.wrapping_add(b);
        b = b.wrapping_sub(a);
        b ^= a.rotate_left(6);
        a = a.wrapping_add(c);
        c = c.wrapping_sub(b);
        c ^= b.rotate_left(8);
        b = b.wrapping_add(a);
        a = a.wrapping_sub(c);
        a ^= c.rotate_left(16);
        c = c.wrapping_add(b);
        b = b.wrapping_sub(a);
        b ^= a.rotate_left(19);
        a = a.wrapping_add(c);
        c = c.wrapping_sub(b);
        c ^= b.rotate_left(4);
        b = b.wrapping_add(a);

        rest = &rest[12..];
    }

    if rest.is_empty() {
        return c;
    }
    a = a.wrapping_add(le_u32(&rest[..rest.len().min(4)]));
    if rest.len() > 4 {
        b = b.wrapping_add(le_u32(&rest[4..rest.len().min(8)]));
    }
    if rest.len() > 8 {
        c = c.wrapping_add(le_u32(&rest[8..]));
    }

    c ^= b;
    c = c.wrapping_sub(b.rotate_left(14));
    a ^= c;
    a = a.wrapping_sub(c.rotate_left(11));
    b ^= a;
    b = b.wrapping_sub(a.rotate_left(25));
    c ^= b;
    c = c.wrapping_sub(b.rotate_left(16));
    a ^= c;
    a = a.wrapping_sub(c.rotate_left(4));
    b ^= a;
    b = b.wrapping_sub(a.rotate_left(14));
    c ^= b;
    c = c.wrapping_sub(b.rotate_left(24));
    c
}

/// MurmurHash2 as implemented by HBase: tail bytes are sign extended.
fn murmur_hash2(key: &[u8], seed: u32) -> u32 {
    const M: u32 = 0x5bd1_e995;
    const R: u32 = 24;

    let mut h = seed ^ key.len() as u32;
    let mut chunks = key.chunks_exact(4);
    for chunk in &mut chunks {
        let mut k = le_u32(chunk);
        k = k.wrapping_mul(M);
        k ^= k >> R;
        k = k.wrapping_mul(M);
        h = h.wrapping_mul(M);
        h ^= k;
    }

    let tail = chunks.remainder();
    let signed = |i: usize| tail[i] as i8 as i32 as u32;
    if tail.len() >= 3 {
        h ^= signed(2) << 16;
    }
    if tail.len() >= 2 {
        h ^= signed(1) << 8;
    }
    if !tail.is_empty() {
        h ^= signed(0);
        h = h.wrapping_mul(M);
    }

    h ^= h >> 13;
    h = h.wrapping_mul(M);
    h ^= h >> 15;
    h
}

/// MurmurHash3, x86 32-bit variant.
fn murmur_hash3(key: &[u8], seed: u32) -> u32 {
    const C1: u32 = 0xcc9e_2d51;
    const C2: u32 = 0x1b87_3593;

    let mut h = seed;
    let mut chunks = key.chunks_exact(4);
    for chunk in &mut chunks {
        let k = le_u32(chunk)
            .wrapping_mul(C1)
            .rotate_left(15)
            .wrapping_mul(C2);
        h ^= k;
        h = h.rotate_left(13).wrapping_mul(5).wrapping_add(0xe654_6b64);
    }

    let tail = chunks.remainder();
    if !tail.is_empty() {
        let k = le_u32(tail)
            .wrapping_mul(C1)
            .rotate_left(15)
            .wrapping_mul(C2);
        h ^= k;
    }

    h ^= key.len() as u32;
    h ^= h >> 16;
    h = h.wrapping_mul(0x85eb_ca6b);
    h ^= h >> 13;
    h = h.wrapping_mul(0xc2b2_ae35);
    h ^= h >> 16;
    h
}
