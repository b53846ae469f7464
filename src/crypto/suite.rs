// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

//! Registry of the cipher suites usable for QUIC packet protection
//!
//! Each suite carries its AEAD and header-protection algorithms, the
//! HKDF-Expand-Label inputs matching its key sizes, and the number of
//! packets one set of keys is allowed to seal.

use crate::crypto::label;
use core::fmt;
use ring::{aead, hkdf};

/// TLS 1.3 cipher suites defined for QUIC version 1 (RFC 9001 §5)
// ignore casing warnings in order to preserve the IANA names
#[allow(non_camel_case_types)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CipherSuite {
    TLS_AES_128_GCM_SHA256,
    TLS_AES_256_GCM_SHA384,
    TLS_CHACHA20_POLY1305_SHA256,
}

/// Hash function backing the key schedule of a negotiated suite
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum HashId {
    Sha256,
    Sha384,
}

impl HashId {
    /// Output length in bytes; traffic secrets must be exactly this long
    #[inline]
    pub fn output_len(self) -> usize {
        match self {
            Self::Sha256 => 32,
            Self::Sha384 => 48,
        }
    }

    #[inline]
    pub(crate) fn hkdf_algorithm(self) -> hkdf::Algorithm {
        match self {
            Self::Sha256 => hkdf::HKDF_SHA256,
            Self::Sha384 => hkdf::HKDF_SHA384,
        }
    }

    /// The label deriving the next-epoch traffic secret ("quic ku")
    #[inline]
    pub(crate) fn key_update_label(self) -> &'static [u8] {
        match self {
            Self::Sha256 => &label::QUIC_KU_32,
            Self::Sha384 => &label::QUIC_KU_48,
        }
    }
}

impl CipherSuite {
    /// AEAD key length in bytes
    #[inline]
    pub fn key_len(self) -> usize {
        self.aead_algorithm().key_len()
    }

    /// AEAD nonce length in bytes; fixed at 12 for every QUIC suite
    #[inline]
    pub const fn iv_len(self) -> usize {
        aead::NONCE_LEN
    }

    /// Header protection key length in bytes
    #[inline]
    pub fn hp_key_len(self) -> usize {
        self.hp_algorithm().key_len()
    }

    /// Authentication tag length in bytes
    #[inline]
    pub fn tag_len(self) -> usize {
        self.aead_algorithm().tag_len()
    }

    /// The hash bound to this suite by its TLS definition
    #[inline]
    pub fn hash(self) -> HashId {
        match self {
            Self::TLS_AES_128_GCM_SHA256 | Self::TLS_CHACHA20_POLY1305_SHA256 => HashId::Sha256,
            Self::TLS_AES_256_GCM_SHA384 => HashId::Sha384,
        }
    }

    //= https://www.rfc-editor.org/rfc/rfc9001#section-6.6
    //# For AEAD_AES_128_GCM and AEAD_AES_256_GCM, the confidentiality limit
    //# is 2^23 encrypted packets; see Appendix B.1.

    //= https://www.rfc-editor.org/rfc/rfc9001#section-6.6
    //# For
    //# AEAD_CHACHA20_POLY1305, the confidentiality limit is greater than the
    //# number of possible packets (2^62) and so can be disregarded.

    /// Maximum number of packets one set of keys may seal
    #[inline]
    pub fn confidentiality_limit(self) -> u64 {
        match self {
            Self::TLS_AES_128_GCM_SHA256 | Self::TLS_AES_256_GCM_SHA384 => u64::pow(2, 23),
            Self::TLS_CHACHA20_POLY1305_SHA256 => u64::pow(2, 62),
        }
    }

    #[inline]
    pub(crate) fn aead_algorithm(self) -> &'static aead::Algorithm {
        match self {
            Self::TLS_AES_128_GCM_SHA256 => &aead::AES_128_GCM,
            Self::TLS_AES_256_GCM_SHA384 => &aead::AES_256_GCM,
            Self::TLS_CHACHA20_POLY1305_SHA256 => &aead::CHACHA20_POLY1305,
        }
    }

    #[inline]
    pub(crate) fn hp_algorithm(self) -> &'static aead::quic::Algorithm {
        match self {
            Self::TLS_AES_128_GCM_SHA256 => &aead::quic::AES_128,
            Self::TLS_AES_256_GCM_SHA384 => &aead::quic::AES_256,
            Self::TLS_CHACHA20_POLY1305_SHA256 => &aead::quic::CHACHA20,
        }
    }

    #[inline]
    pub(crate) fn key_label(self) -> &'static [u8] {
        match self.key_len() {
            16 => &label::QUIC_KEY_16,
            _ => &label::QUIC_KEY_32,
        }
    }

    #[inline]
    pub(crate) fn iv_label(self) -> &'static [u8] {
        &label::QUIC_IV_12
    }

    #[inline]
    pub(crate) fn hp_label(self) -> &'static [u8] {
        match self.hp_key_len() {
            16 => &label::QUIC_HP_16,
            _ => &label::QUIC_HP_32,
        }
    }
}

impl fmt::Display for CipherSuite {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            Self::TLS_AES_128_GCM_SHA256 => "TLS_AES_128_GCM_SHA256",
            Self::TLS_AES_256_GCM_SHA384 => "TLS_AES_256_GCM_SHA384",
            Self::TLS_CHACHA20_POLY1305_SHA256 => "TLS_CHACHA20_POLY1305_SHA256",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::label::compute_label;

    const SUITES: [CipherSuite; 3] = [
        CipherSuite::TLS_AES_128_GCM_SHA256,
        CipherSuite::TLS_AES_256_GCM_SHA384,
        CipherSuite::TLS_CHACHA20_POLY1305_SHA256,
    ];

    fn compute_vec_label(len: usize, label: &[u8]) -> Vec<u8> {
        let mut out = vec![];
        compute_label(len, label, &mut out);
        out
    }

    #[test]
    fn labels_match_key_sizes() {
        for suite in SUITES {
            assert_eq!(compute_vec_label(suite.key_len(), b"quic key"), suite.key_label());
            assert_eq!(compute_vec_label(suite.iv_len(), b"quic iv"), suite.iv_label());
            assert_eq!(compute_vec_label(suite.hp_key_len(), b"quic hp"), suite.hp_label());
            assert_eq!(
                compute_vec_label(suite.hash().output_len(), b"quic ku"),
                suite.hash().key_update_label()
            );
        }
    }

    #[test]
    fn suite_constants() {
        for suite in SUITES {
            assert_eq!(suite.iv_len(), 12);
            assert_eq!(suite.tag_len(), 16);
            assert_eq!(suite.hp_algorithm().sample_len(), 16);
        }
        assert_eq!(CipherSuite::TLS_AES_128_GCM_SHA256.key_len(), 16);
        assert_eq!(CipherSuite::TLS_AES_256_GCM_SHA384.key_len(), 32);
        assert_eq!(CipherSuite::TLS_CHACHA20_POLY1305_SHA256.key_len(), 32);
    }
}
