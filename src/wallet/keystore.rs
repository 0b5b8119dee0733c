use color_eyre::eyre::{
    Result,
    WrapErr,
    eyre,
};
use ed25519_dalek::SigningKey;
use serde::Deserialize;
use std::{
    fs,
    path::{
        Path,
        PathBuf,
    },
};

const KEY_PREFIX: &str = "ed25519:";

#[derive(Clone, Debug)]
pub struct CredentialDescriptor {
    pub account_id: String,
    pub path: PathBuf,
}

impl CredentialDescriptor {
    pub fn new(account_id: impl Into<String>, path: PathBuf) -> Self {
        Self {
            account_id: account_id.into(),
            path,
        }
    }
}

/// An unlocked full-access key for one account.
#[derive(Clone, Debug)]
pub struct Credentials {
    pub account_id: String,
    pub signing_key: SigningKey,
}

impl Credentials {
    pub fn public_key(&self) -> [u8; 32] {
        self.signing_key.verifying_key().to_bytes()
    }

    /// The public key in the `ed25519:<base58>` form used by the RPC.
    pub fn public_key_string(&self) -> String {
        format!("{KEY_PREFIX}{}", bs58::encode(self.public_key()).into_string())
    }
}

#[derive(Deserialize)]
struct CredentialFile {
    account_id: String,
    #[serde(default)]
    public_key: Option<String>,
    #[serde(alias = "secret_key")]
    private_key: String,
}

pub fn default_credentials_dir() -> Result<PathBuf> {
    let home = std::env::var("HOME").wrap_err("HOME environment variable not set")?;
    Ok(PathBuf::from(home).join(".near-credentials"))
}

pub fn resolve_credentials_dir(dir: Option<&str>) -> Result<PathBuf> {
    match dir {
        Some(raw) => {
            let expanded = shellexpand::tilde(raw);
            Ok(PathBuf::from(expanded.into_owned()))
        }
        None => default_credentials_dir(),
    }
}

pub fn list_credentials(dir: &Path) -> Result<Vec<CredentialDescriptor>> {
    if !dir.exists() {
        return Ok(Vec::new());
    }
    let mut found = Vec::new();
    for entry in fs::read_dir(dir).wrap_err("Failed to read credentials directory")? {
        let entry = entry.wrap_err("Failed to read credentials entry")?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        if path.extension().and_then(|ext| ext.to_str()) != Some("json") {
            continue;
        }
        let account_id = path
            .file_stem()
            .and_then(|stem| stem.to_str())
            .ok_or_else(|| eyre!("Invalid credentials filename {:?}", path))?
            .to_owned();
        found.push(CredentialDescriptor::new(account_id, path));
    }
    found.sort_by(|a, b| a.account_id.cmp(&b.account_id));
    Ok(found)
}

pub fn find_credentials(dir: &Path, account_id: &str) -> Result<CredentialDescriptor> {
    list_credentials(dir)?
        .into_iter()
        .find(|c| c.account_id == account_id)
        .ok_or_else(|| {
            eyre!(
                "No credentials for '{account_id}' in {}",
                dir.to_string_lossy()
            )
        })
}

pub fn load_credentials(descriptor: &CredentialDescriptor) -> Result<Credentials> {
    let raw = fs::read(&descriptor.path).wrap_err_with(|| {
        format!("Failed to read credentials file {}", descriptor.path.display())
    })?;
    let file: CredentialFile = serde_json::from_slice(&raw).wrap_err_with(|| {
        format!("Malformed credentials file {}", descriptor.path.display())
    })?;
    let signing_key = parse_secret_key(&file.private_key)
        .wrap_err_with(|| format!("Unusable key for '{}'", file.account_id))?;
    let credentials = Credentials {
        account_id: file.account_id,
        signing_key,
    };
    if let Some(expected) = file.public_key
        && expected != credentials.public_key_string()
    {
        return Err(eyre!(
            "Public key in {} does not match its private key",
            descriptor.path.display()
        ));
    }
    Ok(credentials)
}

/// Accepts either the 64-byte `secret || public` form written by the NEAR CLI
/// or a bare 32-byte seed.
pub fn parse_secret_key(encoded: &str) -> Result<SigningKey> {
    let body = encoded
        .strip_prefix(KEY_PREFIX)
        .ok_or_else(|| eyre!("Only ed25519 keys are supported"))?;
    let bytes = bs58::decode(body)
        .into_vec()
        .wrap_err("Secret key is not valid base58")?;
    let seed: [u8; 32] = match bytes.len() {
        32 | 64 => bytes[..32]
            .try_into()
            .map_err(|_| eyre!("Secret key has an unexpected length"))?,
        other => return Err(eyre!("Secret key has {other} bytes, expected 32 or 64")),
    };
    Ok(SigningKey::from_bytes(&seed))
}
