// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

//! Key schedule for one encryption level (RFC 9001 §5.1)
//!
//! A traffic secret expands into an AEAD key, a packet-protection IV and a
//! header-protection key. Raw key bytes only ever live in zeroizing stack
//! buffers; everything long-lived is held inside the backend's opaque types.

use crate::{
    crypto::{
        suite::{CipherSuite, HashId},
        HeaderProtectionMask,
    },
    error::Error,
};
use ring::{aead, hkdf};
use zeroize::{Zeroize, Zeroizing};

const MAX_KEY_LEN: usize = 32;

struct KeyLen(usize);

impl hkdf::KeyType for KeyLen {
    #[inline]
    fn len(&self) -> usize {
        self.0
    }
}

fn expand_into(secret: &hkdf::Prk, label: &'static [u8], out: &mut [u8]) {
    secret
        .expand(&[label], KeyLen(out.len()))
        .expect("label size verified")
        .fill(out)
        .expect("fill size verified");
}

/// Packet-protection IV, combined with the packet number into the AEAD nonce
pub(crate) struct Iv([u8; aead::NONCE_LEN]);

impl Iv {
    fn new(secret: &hkdf::Prk, label: &'static [u8]) -> Self {
        let mut bytes = [0u8; aead::NONCE_LEN];
        expand_into(secret, label, &mut bytes);
        Self(bytes)
    }

    //= https://www.rfc-editor.org/rfc/rfc9001#section-5.3
    //# The nonce, N, is formed by combining the packet
    //# protection IV with the packet number.  The 62 bits of the
    //# reconstructed QUIC packet number in network byte order are left-
    //# padded with zeros to the size of the IV.  The exclusive OR of the
    //# padded packet number and the IV forms the AEAD nonce.
    #[inline]
    fn nonce(&self, packet_number: u64) -> [u8; aead::NONCE_LEN] {
        let mut nonce = [0u8; aead::NONCE_LEN];
        nonce[aead::NONCE_LEN - 8..].copy_from_slice(&packet_number.to_be_bytes());

        for (a, b) in nonce.iter_mut().zip(self.0.iter()) {
            *a ^= b;
        }

        nonce
    }
}

impl Drop for Iv {
    fn drop(&mut self) {
        self.0.zeroize();
    }
}

/// AEAD key material for one epoch, plus the secret it was expanded from
///
/// The secret is retained because a key update expands the next epoch's
/// secret from it; it is dropped together with the keys.
pub(crate) struct EpochKeys {
    secret: hkdf::Prk,
    sealer: aead::LessSafeKey,
    iv: Iv,
}

impl EpochKeys {
    /// Installs a traffic secret, expanding the packet-protection keys
    pub fn new(suite: CipherSuite, hash: HashId, secret: &[u8]) -> Result<Self, Error> {
        if secret.len() != hash.output_len() {
            return Err(Error::BadSecretLen);
        }

        let secret = hkdf::Prk::new_less_safe(hash.hkdf_algorithm(), secret);
        Ok(Self::expand(suite, secret))
    }

    fn expand(suite: CipherSuite, secret: hkdf::Prk) -> Self {
        let sealer = {
            let mut key = Zeroizing::new([0u8; MAX_KEY_LEN]);
            let key = &mut key[..suite.key_len()];
            expand_into(&secret, suite.key_label(), key);
            let key = aead::UnboundKey::new(suite.aead_algorithm(), key)
                .expect("key length matches the algorithm");
            aead::LessSafeKey::new(key)
        };
        let iv = Iv::new(&secret, suite.iv_label());

        Self { secret, sealer, iv }
    }

    /// Expands the next epoch's keys as defined in
    /// https://www.rfc-editor.org/rfc/rfc9001#section-6
    pub fn update(&self, suite: CipherSuite, hash: HashId) -> Self {
        let next: hkdf::Prk = self
            .secret
            .expand(&[hash.key_update_label()], hash.hkdf_algorithm())
            .expect("label size verified")
            .into();

        Self::expand(suite, next)
    }

    /// Seals `payload` in place and returns the authentication tag
    ///
    /// The caller guarantees packet numbers never repeat within an epoch,
    /// which is what makes the derived nonce unique.
    #[inline]
    pub fn seal_in_place(
        &self,
        packet_number: u64,
        header: &[u8],
        payload: &mut [u8],
    ) -> aead::Tag {
        let nonce = aead::Nonce::assume_unique_for_key(self.iv.nonce(packet_number));
        self.sealer
            .seal_in_place_separate_tag(nonce, aead::Aad::from(header), payload)
            .expect("encryption should always work")
    }
}

/// Header protection key (RFC 9001 §5.4)
///
/// Unlike the packet-protection keys, this key survives key updates.
pub(crate) struct HeaderKey(aead::quic::HeaderProtectionKey);

impl HeaderKey {
    pub fn new(suite: CipherSuite, secret: &hkdf::Prk) -> Self {
        let mut bytes = Zeroizing::new([0u8; MAX_KEY_LEN]);
        let bytes = &mut bytes[..suite.hp_key_len()];
        expand_into(secret, suite.hp_label(), bytes);

        let key = aead::quic::HeaderProtectionKey::new(suite.hp_algorithm(), bytes)
            .expect("header secret length already checked");
        Self(key)
    }

    #[inline]
    pub fn sample_len(&self) -> usize {
        self.0.algorithm().sample_len()
    }

    /// Derives the 5-byte protection mask from a ciphertext sample
    #[inline]
    pub fn mask(&self, sample: &[u8]) -> HeaderProtectionMask {
        self.0.new_mask(sample).expect("sample length already checked")
    }
}

/// Derives a fresh header key alongside the epoch keys for `new`-style
/// provisioning; split so key updates can skip it.
pub(crate) fn derive(
    suite: CipherSuite,
    hash: HashId,
    secret: &[u8],
) -> Result<(EpochKeys, HeaderKey), Error> {
    let keys = EpochKeys::new(suite, hash, secret)?;
    let header_key = HeaderKey::new(suite, &keys.secret);
    Ok((keys, header_key))
}

#[cfg(test)]
mod tests {
    use super::*;
    use hex_literal::hex;

    //= https://www.rfc-editor.org/rfc/rfc9001#appendix-A.1
    //# client_initial_secret
    //#     = HKDF-Expand-Label(initial_secret, "client in", "", 32)
    //#     = c00cf151ca5be075ed0ebfb5c80323c4
    //#       2d6b7db67881289af4008f1f6c357aea
    const CLIENT_INITIAL_SECRET: [u8; 32] =
        hex!("c00cf151ca5be075ed0ebfb5c80323c42d6b7db67881289af4008f1f6c357aea");

    #[test]
    fn rfc9001_appendix_a1_expansion() {
        let secret = hkdf::Prk::new_less_safe(hkdf::HKDF_SHA256, &CLIENT_INITIAL_SECRET);
        let suite = CipherSuite::TLS_AES_128_GCM_SHA256;

        let mut key = [0u8; 16];
        expand_into(&secret, suite.key_label(), &mut key);
        assert_eq!(key, hex!("1f369613dd76d5467730efcbe3b1a22d"));

        let mut iv = [0u8; 12];
        expand_into(&secret, suite.iv_label(), &mut iv);
        assert_eq!(iv, hex!("fa044b2f42a3fd3b46fb255c"));

        let mut hp = [0u8; 16];
        expand_into(&secret, suite.hp_label(), &mut hp);
        assert_eq!(hp, hex!("9f50449e04a0e810283a1e9933adedd2"));
    }

    #[test]
    fn nonce_xors_packet_number() {
        let iv = Iv(hex!("fa044b2f42a3fd3b46fb255c"));
        // packet number zero leaves the IV untouched
        assert_eq!(iv.nonce(0), hex!("fa044b2f42a3fd3b46fb255c"));
        assert_eq!(iv.nonce(2)[11], 0x5c ^ 0x02);
        assert_eq!(&iv.nonce(2)[..11], &hex!("fa044b2f42a3fd3b46fb25"));
    }

    #[test]
    fn secret_len_is_checked() {
        let short = [0u8; 16];
        assert!(matches!(
            EpochKeys::new(CipherSuite::TLS_AES_128_GCM_SHA256, HashId::Sha256, &short),
            Err(Error::BadSecretLen)
        ));
        // a SHA-384 length secret is rejected for a SHA-256 hash
        let long = [0u8; 48];
        assert!(matches!(
            EpochKeys::new(CipherSuite::TLS_AES_128_GCM_SHA256, HashId::Sha256, &long),
            Err(Error::BadSecretLen)
        ));
    }
}
