use std::fs::{self, File};
use std::io::{BufReader, BufWriter, ErrorKind, Read, Write};
use std::path::{Component, Path, PathBuf};
use std::process::Command;

use log::{debug, info};
use sha2::{Digest, Sha256};

use crate::error::FoxError;
use crate::session::JudgeSession;

const PACKAGE_MAGIC: [u8; 4] = *b"FOXP";
const PACKAGE_VERSION: u16 = 1;

/// Workspace directories a package may carry.
pub const WORKSPACE_DIRS: [&str; 5] = ["answers", "cases", "bin", "codes", "generators"];

pub struct SignOptions {
  pub key: String,
  pub passphrase: Option<String>,
}

pub struct PackageInfo {
  pub version: u16,
  /// The embedded problem configuration document.
  pub config: String,
  /// Hex SHA-256 over the file table.
  pub digest: String,
  pub signature: Vec<u8>,
  /// Relative path and size of every carried file.
  pub files: Vec<(String, u64)>,
}

impl PackageInfo {
  pub fn signed(&self) -> bool {
    !self.signature.is_empty()
  }
}

fn hex(digest: &[u8]) -> String {
  digest.iter().map(|byte| format!("{:02x}", byte)).collect()
}

fn collect_dir(dir: &Path, base: &Path, out: &mut Vec<(String, PathBuf)>) -> Result<(), FoxError> {
  for entry in fs::read_dir(dir)? {
    let path = entry?.path();
    if path.is_dir() {
      collect_dir(&path, base, out)?;
    } else {
      let name = path
        .strip_prefix(base)
        .map_err(|_| FoxError::package("file escapes the workspace"))?
        .to_string_lossy()
        .to_string();
      out.push((name, path));
    }
  }
  Ok(())
}

/// Workspace files in a deterministic order, so the digest is stable.
fn collect_files(base: &Path) -> Result<Vec<(String, PathBuf)>, FoxError> {
  let mut files = vec![];
  for dir in WORKSPACE_DIRS.iter() {
    let dir = base.join(dir);
    if dir.is_dir() {
      collect_dir(&dir, base, &mut files)?;
    }
  }
  files.sort();
  Ok(files)
}

fn file_table_digest(files: &[(String, PathBuf)]) -> Result<[u8; 32], FoxError> {
  let mut hasher = Sha256::new();
  for (name, path) in files.iter() {
    let content = fs::read(path)?;
    hasher.update(name.as_bytes());
    hasher.update((content.len() as u64).to_le_bytes());
    hasher.update(&content);
  }
  Ok(hasher.finalize().into())
}

fn write_block<W: Write>(writer: &mut W, block: &[u8]) -> Result<(), FoxError> {
  writer.write_all(&(block.len() as u32).to_le_bytes())?;
  writer.write_all(block)?;
  Ok(())
}

fn read_block<R: Read>(reader: &mut R) -> Result<Vec<u8>, FoxError> {
  let mut len = [0u8; 4];
  reader.read_exact(&mut len)?;
  let mut block = vec![0u8; u32::from_le_bytes(len) as usize];
  reader.read_exact(&mut block)?;
  Ok(block)
}

/// Read the next entry path length, or `None` at a clean end of file.
fn read_entry_head<R: Read>(reader: &mut R) -> Result<Option<u16>, FoxError> {
  let mut len = [0u8; 2];
  match reader.read_exact(&mut len) {
    Ok(_) => Ok(Some(u16::from_le_bytes(len))),
    Err(err) if err.kind() == ErrorKind::UnexpectedEof => Ok(None),
    Err(err) => Err(err.into()),
  }
}

/// Pack a problem workspace into a single package file.
pub fn pack_problem(
  config: &Path,
  output: &Path,
  sign: Option<SignOptions>,
) -> Result<(), FoxError> {
  let text = fs::read_to_string(config)
    .map_err(|err| FoxError::config(format!("read {}: {}", config.to_string_lossy(), err)))?;
  // Validate the document before freezing it into a package.
  serde_json::from_str::<JudgeSession>(&text)?;

  let base = config.parent().unwrap_or_else(|| Path::new("."));
  let files = collect_files(base)?;
  let digest = file_table_digest(&files)?;

  let signature = match sign {
    Some(options) => gpg_sign(&digest, &options, output)?,
    None => vec![],
  };

  let mut writer = BufWriter::new(File::create(output)?);
  writer.write_all(&PACKAGE_MAGIC)?;
  writer.write_all(&PACKAGE_VERSION.to_le_bytes())?;
  write_block(&mut writer, text.as_bytes())?;
  writer.write_all(&digest)?;
  write_block(&mut writer, &signature)?;

  for (name, path) in files.iter() {
    let content = fs::read(path)?;
    writer.write_all(&(name.as_bytes().len() as u16).to_le_bytes())?;
    writer.write_all(name.as_bytes())?;
    writer.write_all(&(content.len() as u64).to_le_bytes())?;
    writer.write_all(&content)?;
    debug!("Pack {} ({} bytes)", name, content.len());
  }
  writer.flush()?;

  info!(
    "Packed {} file(s) into {}",
    files.len(),
    output.to_string_lossy()
  );
  Ok(())
}

/// Read a package header and file table, verifying the payload digest.
pub fn read_package(package: &Path) -> Result<PackageInfo, FoxError> {
  let mut reader = BufReader::new(File::open(package)?);

  let mut magic = [0u8; 4];
  reader.read_exact(&mut magic)?;
  if magic != PACKAGE_MAGIC {
    return Err(FoxError::package("not a problem package"));
  }

  let mut version = [0u8; 2];
  reader.read_exact(&mut version)?;
  let version = u16::from_le_bytes(version);
  if version > PACKAGE_VERSION {
    return Err(FoxError::package(format!(
      "unsupported package version {}",
      version
    )));
  }

  let config = String::from_utf8(read_block(&mut reader)?)
    .map_err(|_| FoxError::package("configuration is not valid UTF-8"))?;

  let mut digest = [0u8; 32];
  reader.read_exact(&mut digest)?;
  let signature = read_block(&mut reader)?;

  let mut hasher = Sha256::new();
  let mut files = vec![];
  while let Some(name_len) = read_entry_head(&mut reader)? {
    let mut name = vec![0u8; name_len as usize];
    reader.read_exact(&mut name)?;
    let name = String::from_utf8(name)
      .map_err(|_| FoxError::package("file name is not valid UTF-8"))?;

    let mut size = [0u8; 8];
    reader.read_exact(&mut size)?;
    let size = u64::from_le_bytes(size);

    hasher.update(name.as_bytes());
    hasher.update(size.to_le_bytes());

    let mut remaining = size;
    let mut chunk = [0u8; 8192];
    while remaining > 0 {
      let want = remaining.min(chunk.len() as u64) as usize;
      reader.read_exact(&mut chunk[..want])?;
      hasher.update(&chunk[..want]);
      remaining -= want as u64;
    }

    files.push((name, size));
  }

  let actual: [u8; 32] = hasher.finalize().into();
  if actual != digest {
    return Err(FoxError::package("payload digest mismatch"));
  }

  Ok(PackageInfo {
    version,
    config,
    digest: hex(&digest),
    signature,
    files,
  })
}

fn safe_join(workdir: &Path, name: &str) -> Result<PathBuf, FoxError> {
  let relative = Path::new(name);
  let plain = relative
    .components()
    .all(|component| matches!(component, Component::Normal(_)));
  if !plain {
    return Err(FoxError::package(format!("unsafe file name {}", name)));
  }
  Ok(workdir.join(relative))
}

/// Extract a problem package into a workspace directory and return the
/// path of the materialised configuration document.
pub fn extract_package(package: &Path, workdir: &Path) -> Result<PathBuf, FoxError> {
  // A full verification pass first, nothing is written for a bad package.
  let info = read_package(package)?;

  fs::create_dir_all(workdir)?;
  for dir in WORKSPACE_DIRS.iter() {
    fs::create_dir_all(workdir.join(dir))?;
  }

  let mut reader = BufReader::new(File::open(package)?);
  let mut header = [0u8; 6];
  reader.read_exact(&mut header)?;
  read_block(&mut reader)?;
  let mut digest = [0u8; 32];
  reader.read_exact(&mut digest)?;
  read_block(&mut reader)?;

  while let Some(name_len) = read_entry_head(&mut reader)? {
    let mut name = vec![0u8; name_len as usize];
    reader.read_exact(&mut name)?;
    let name = String::from_utf8(name)
      .map_err(|_| FoxError::package("file name is not valid UTF-8"))?;
    let target = safe_join(workdir, &name)?;

    let mut size = [0u8; 8];
    reader.read_exact(&mut size)?;
    let mut remaining = u64::from_le_bytes(size);

    if let Some(parent) = target.parent() {
      fs::create_dir_all(parent)?;
    }
    let mut writer = BufWriter::new(File::create(&target)?);
    let mut chunk = [0u8; 8192];
    while remaining > 0 {
      let want = remaining.min(chunk.len() as u64) as usize;
      reader.read_exact(&mut chunk[..want])?;
      writer.write_all(&chunk[..want])?;
      remaining -= want as u64;
    }
    writer.flush()?;
  }

  let config_path = workdir.join("problem.json");
  fs::write(&config_path, info.config.as_bytes())?;

  info!(
    "Extracted {} file(s) into {}",
    info.files.len(),
    workdir.to_string_lossy()
  );
  Ok(config_path)
}

fn gpg_sign(digest: &[u8; 32], options: &SignOptions, output: &Path) -> Result<Vec<u8>, FoxError> {
  let digest_path = output.with_extension("digest");
  let sig_path = output.with_extension("digest.sig");
  fs::write(&digest_path, hex(digest))?;

  let mut command = Command::new("gpg");
  command
    .arg("--batch")
    .arg("--yes")
    .arg("--detach-sign")
    .arg("--local-user")
    .arg(&options.key)
    .arg("--output")
    .arg(&sig_path);
  if let Some(passphrase) = &options.passphrase {
    command
      .arg("--pinentry-mode")
      .arg("loopback")
      .arg("--passphrase")
      .arg(passphrase);
  }
  command.arg(&digest_path);

  let result = command.output();
  let _ = fs::remove_file(&digest_path);

  let result = result.map_err(|err| FoxError::package(format!("invoke gpg: {}", err)))?;
  if !result.status.success() {
    let _ = fs::remove_file(&sig_path);
    return Err(FoxError::package(format!(
      "gpg sign failed: {}",
      String::from_utf8_lossy(&result.stderr).trim()
    )));
  }

  let signature = fs::read(&sig_path)?;
  let _ = fs::remove_file(&sig_path);
  Ok(signature)
}

/// Verify the embedded signature with gpg and return its report.
pub fn verify_signature(package: &Path) -> Result<String, FoxError> {
  let info = read_package(package)?;
  if !info.signed() {
    return Err(FoxError::package("package is not signed"));
  }

  let digest_path = package.with_extension("digest");
  let sig_path = package.with_extension("digest.sig");
  fs::write(&digest_path, &info.digest)?;
  fs::write(&sig_path, &info.signature)?;

  let result = Command::new("gpg")
    .arg("--batch")
    .arg("--verify")
    .arg(&sig_path)
    .arg(&digest_path)
    .output();

  let _ = fs::remove_file(&digest_path);
  let _ = fs::remove_file(&sig_path);

  let result = result.map_err(|err| FoxError::package(format!("invoke gpg: {}", err)))?;
  let report = String::from_utf8_lossy(&result.stderr).to_string();
  if !result.status.success() {
    return Err(FoxError::package(format!(
      "signature verification failed: {}",
      report.trim()
    )));
  }
  Ok(report)
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::io::{Seek, SeekFrom};

  fn write_workspace(base: &Path) -> PathBuf {
    fs::create_dir_all(base.join("cases")).unwrap();
    fs::create_dir_all(base.join("answers")).unwrap();
    fs::write(base.join("cases/1.in"), "1 2\n").unwrap();
    fs::write(base.join("answers/1.out"), "3\n").unwrap();

    let config = base.join("problem.json");
    let session = JudgeSession {
      session_id: "pack-test".to_string(),
      ..JudgeSession::default()
    };
    fs::write(&config, serde_json::to_string_pretty(&session).unwrap()).unwrap();
    config
  }

  #[test]
  fn test_pack_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_workspace(dir.path());
    let package = dir.path().join("problem.fox");

    pack_problem(&config, &package, None).unwrap();
    let info = read_package(&package).unwrap();

    assert_eq!(info.version, PACKAGE_VERSION);
    assert!(!info.signed());
    assert_eq!(
      info.files,
      vec![
        ("answers/1.out".to_string(), 2),
        ("cases/1.in".to_string(), 4),
      ]
    );
    let session: JudgeSession = serde_json::from_str(&info.config).unwrap();
    assert_eq!(session.session_id, "pack-test");

    let workdir = dir.path().join("extracted");
    let config = extract_package(&package, &workdir).unwrap();
    assert_eq!(fs::read_to_string(workdir.join("cases/1.in")).unwrap(), "1 2\n");
    assert_eq!(
      fs::read_to_string(workdir.join("answers/1.out")).unwrap(),
      "3\n"
    );
    assert!(config.ends_with("problem.json"));
  }

  #[test]
  fn test_digest_detects_corruption() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_workspace(dir.path());
    let package = dir.path().join("problem.fox");
    pack_problem(&config, &package, None).unwrap();

    // Flip the last payload byte.
    let mut file = fs::OpenOptions::new().write(true).open(&package).unwrap();
    file.seek(SeekFrom::End(-1)).unwrap();
    file.write_all(&[0x7f]).unwrap();

    match read_package(&package) {
      Err(FoxError::Package(message)) => assert!(message.contains("digest")),
      other => panic!("expected digest mismatch, got {:?}", other.map(|_| ())),
    }
  }

  #[test]
  fn test_reject_unsafe_names() {
    let dir = tempfile::tempdir().unwrap();
    assert!(safe_join(dir.path(), "cases/1.in").is_ok());
    assert!(safe_join(dir.path(), "../escape").is_err());
    assert!(safe_join(dir.path(), "/etc/passwd").is_err());
  }
}
