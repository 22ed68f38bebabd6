use std::{
    io::{BufReader, Cursor},
    net::IpAddr,
};

use base64::prelude::*;
use der::{
    asn1::ObjectIdentifier, oid::AssociatedOid as _, Decode as _, DecodePem as _, Encode as _,
};
use eyre::{eyre, WrapErr as _};
use pkcs8::DecodePrivateKey as _;
use rsa::pkcs1::DecodeRsaPrivateKey as _;
use time::{OffsetDateTime, PrimitiveDateTime};
use x509_cert::{
    ext::pkix::{name::GeneralName, AuthorityKeyIdentifier, BasicConstraints, SubjectAltName},
    name::Name,
    request::{CertReq, ExtensionReq},
};

/// `id-at-commonName`
const COMMON_NAME: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.5.4.3");

/// An installed certificate that is considered for renewal.
///
/// Only the attributes the renewal logic needs are kept: expiry, CA flag, names, and the pieces of
/// the certificate's identity that make up its ARI certificate ID.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExistingCertificate {
    der: Vec<u8>,
    common_name: Option<String>,
    alt_names: Vec<String>,
    not_after: OffsetDateTime,
    is_ca: bool,
    authority_key_id: Option<Vec<u8>>,
    serial: Vec<u8>,
}

impl ExistingCertificate {
    /// Parses a DER-encoded certificate.
    pub fn from_der(der: &[u8]) -> eyre::Result<Self> {
        let cert = x509_cert::Certificate::from_der(der).context("decode certificate")?;
        let tbs = &cert.tbs_certificate;

        let not_after = tbs.validity.not_after.to_date_time();
        let not_after = PrimitiveDateTime::try_from(not_after)?.assume_utc();

        let is_ca = tbs
            .get::<BasicConstraints>()?
            .is_some_and(|(_critical, constraints)| constraints.ca);

        let authority_key_id = tbs
            .get::<AuthorityKeyIdentifier>()?
            .and_then(|(_critical, aki)| aki.key_identifier)
            .map(|key_id| key_id.as_bytes().to_vec());

        let alt_names = match tbs.get::<SubjectAltName>()? {
            Some((_critical, san)) => general_names(&san),
            None => Vec::new(),
        };

        Ok(ExistingCertificate {
            der: der.to_vec(),
            common_name: common_name(&tbs.subject),
            alt_names,
            not_after,
            is_ca,
            authority_key_id,
            serial: tbs.serial_number.as_bytes().to_vec(),
        })
    }

    /// Parses a PEM bundle into its certificates, leaf first.
    pub fn chain_from_pem(pem: &[u8]) -> eyre::Result<Vec<Self>> {
        let mut rdr = BufReader::new(Cursor::new(pem));

        rustls_pemfile::certs(&mut rdr)
            .map(|res| {
                let cert = res.context("read PEM certificate")?;
                Self::from_der(&cert)
            })
            .collect()
    }

    /// The certificate in DER encoding.
    pub fn der(&self) -> &[u8] {
        &self.der
    }

    /// Subject common name, if any.
    pub fn common_name(&self) -> Option<&str> {
        self.common_name.as_deref()
    }

    /// DNS names and IP addresses from the subject alternative name extension.
    pub fn alt_names(&self) -> &[String] {
        &self.alt_names
    }

    /// The expiry instant.
    pub fn not_after(&self) -> OffsetDateTime {
        self.not_after
    }

    /// Whether the basic constraints mark this as a CA certificate.
    pub fn is_ca(&self) -> bool {
        self.is_ca
    }

    /// All names the certificate is valid for.
    ///
    /// The common name comes first, followed by every alternative name that differs from it, in
    /// the order they appear in the certificate.
    pub fn domains(&self) -> Vec<String> {
        let mut domains = Vec::with_capacity(self.alt_names.len() + 1);

        if let Some(cn) = &self.common_name {
            domains.push(cn.clone());
        }

        for name in &self.alt_names {
            if Some(name) != self.common_name.as_ref() {
                domains.push(name.clone());
            }
        }

        domains
    }

    /// Number of whole days until expiry.
    ///
    /// Negative once the certificate has expired.
    pub fn days_remaining(&self, now: OffsetDateTime) -> i64 {
        (self.not_after - now).whole_days()
    }

    /// Number of whole hours until expiry.
    pub fn hours_remaining(&self, now: OffsetDateTime) -> i64 {
        (self.not_after - now).whole_hours()
    }

    /// The certificate identifier used by ACME Renewal Information.
    ///
    /// Built from the authority key identifier and the serial number, each base64url-encoded
    /// without padding and joined by a dot.
    ///
    /// See [draft-ietf-acme-ari §4.1].
    ///
    /// [draft-ietf-acme-ari §4.1]: https://datatracker.ietf.org/doc/html/draft-ietf-acme-ari#section-4.1
    pub fn ari_cert_id(&self) -> eyre::Result<String> {
        let aki = self
            .authority_key_id
            .as_deref()
            .ok_or_else(|| eyre!("certificate has no authority key identifier"))?;

        if self.serial.is_empty() {
            return Err(eyre!("certificate has an empty serial number"));
        }

        Ok(format!(
            "{}.{}",
            BASE64_URL_SAFE_NO_PAD.encode(aki),
            BASE64_URL_SAFE_NO_PAD.encode(&self.serial),
        ))
    }
}

/// A certificate signing request supplied by the operator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Csr {
    der: Vec<u8>,
    common_name: Option<String>,
    dns_names: Vec<String>,
}

impl Csr {
    /// Parses a CSR from PEM (`CERTIFICATE REQUEST`) or DER.
    pub fn parse(bytes: &[u8]) -> eyre::Result<Self> {
        let pem = std::str::from_utf8(bytes)
            .ok()
            .map(str::trim)
            .filter(|text| text.starts_with("-----BEGIN"));

        let csr = match pem {
            Some(pem) => CertReq::from_pem(pem).context("decode PEM CSR")?,
            None => CertReq::from_der(bytes).context("decode DER CSR")?,
        };

        let mut dns_names = Vec::new();

        for attr in csr.info.attributes.iter() {
            if attr.oid != ExtensionReq::OID {
                continue;
            }

            for value in attr.values.iter() {
                let req = ExtensionReq::from_der(&value.to_der()?)?;

                for ext in req.0.iter().filter(|ext| ext.extn_id == SubjectAltName::OID) {
                    let san = SubjectAltName::from_der(ext.extn_value.as_bytes())?;

                    dns_names.extend(san.0.iter().filter_map(|name| match name {
                        GeneralName::DnsName(name) => Some(name.to_string()),
                        _ => None,
                    }));
                }
            }
        }

        Ok(Csr {
            der: csr.to_der()?,
            common_name: common_name(&csr.info.subject),
            dns_names,
        })
    }

    /// The CSR in DER encoding.
    pub fn der(&self) -> &[u8] {
        &self.der
    }

    /// DNS names requested through the subject alternative name extension.
    pub fn dns_names(&self) -> &[String] {
        &self.dns_names
    }

    /// The domain the certificate is stored under: the common name, or else the first DNS name.
    pub fn main_domain(&self) -> Option<&str> {
        self.common_name
            .as_deref()
            .or_else(|| self.dns_names.first().map(String::as_str))
    }
}

/// A stored private key that can be certified again.
#[derive(Debug, Clone)]
pub enum PrivateKey {
    P256(p256::ecdsa::SigningKey),
    P384(p384::ecdsa::SigningKey),
    Rsa(Box<rsa::RsaPrivateKey>),
}

impl PrivateKey {
    /// Short algorithm name, as used in log messages.
    pub fn algorithm(&self) -> &'static str {
        match self {
            PrivateKey::P256(_) => "P256",
            PrivateKey::P384(_) => "P384",
            PrivateKey::Rsa(_) => "RSA",
        }
    }
}

/// Parses a stored private key from PEM.
///
/// Accepts PKCS #8 (`PRIVATE KEY`) documents holding a P-256, P-384 or RSA key, SEC1
/// (`EC PRIVATE KEY`) documents holding a P-256 or P-384 key, and PKCS #1 (`RSA PRIVATE KEY`)
/// documents.
pub fn parse_private_key(pem: &[u8]) -> eyre::Result<PrivateKey> {
    let pem = std::str::from_utf8(pem).context("private key is not valid PEM")?;
    let pem = pem.trim();

    let label = pem::decode_label(pem.as_bytes())
        .map_err(|err| eyre!("private key is not valid PEM: {err}"))?;

    match label {
        "PRIVATE KEY" => {
            if let Ok(key) = p256::ecdsa::SigningKey::from_pkcs8_pem(pem) {
                return Ok(PrivateKey::P256(key));
            }

            if let Ok(key) = p384::ecdsa::SigningKey::from_pkcs8_pem(pem) {
                return Ok(PrivateKey::P384(key));
            }

            rsa::RsaPrivateKey::from_pkcs8_pem(pem)
                .map(|key| PrivateKey::Rsa(Box::new(key)))
                .context("Failed to read PKCS #8 private key")
        }

        "EC PRIVATE KEY" => {
            if let Ok(secret) = p256::SecretKey::from_sec1_pem(pem) {
                return Ok(PrivateKey::P256(secret.into()));
            }

            let secret = p384::SecretKey::from_sec1_pem(pem)
                .map_err(|err| eyre!("Failed to read SEC1 private key: {err}"))?;
            Ok(PrivateKey::P384(secret.into()))
        }

        "RSA PRIVATE KEY" => rsa::RsaPrivateKey::from_pkcs1_pem(pem)
            .map(|key| PrivateKey::Rsa(Box::new(key)))
            .context("Failed to read PKCS #1 private key"),

        label => Err(eyre!("unsupported private key type: {label}")),
    }
}

fn common_name(name: &Name) -> Option<String> {
    name.0
        .iter()
        .flat_map(|rdn| rdn.0.iter())
        .find(|atv| atv.oid == COMMON_NAME)
        .and_then(|atv| std::str::from_utf8(atv.value.value()).ok())
        .filter(|cn| !cn.is_empty())
        .map(str::to_owned)
}

fn general_names(san: &SubjectAltName) -> Vec<String> {
    san.0
        .iter()
        .filter_map(|name| match name {
            GeneralName::DnsName(name) => Some(name.to_string()),

            GeneralName::IpAddress(octets) => match octets.as_bytes() {
                &[a, b, c, d] => Some(IpAddr::from([a, b, c, d]).to_string()),
                bytes => <[u8; 16]>::try_from(bytes)
                    .ok()
                    .map(|octets| IpAddr::from(octets).to_string()),
            },

            _ => None,
        })
        .collect()
}
