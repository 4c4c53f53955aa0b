//! Resource-manager handle surface (X/Open XA)
//!
//! An [`XaResource`] is the transactional control surface of a session or
//! context. The proxy layer only ever hands it to the coordinator for enlist
//! and delist; driving prepare/commit/rollback is the coordinator's job.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Transaction branch identifier following the X/Open XA layout
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Xid {
    format_id: i32,
    global_transaction_id: Vec<u8>,
    branch_qualifier: Vec<u8>,
}

impl Xid {
    /// Maximum length for the global transaction id
    pub const MAXGTRIDSIZE: usize = 64;
    /// Maximum length for the branch qualifier
    pub const MAXBQUALSIZE: usize = 64;

    /// Create a branch id.
    ///
    /// Fails with [`XaError::InvalidXid`] when either part exceeds its XA limit.
    pub fn new(
        format_id: i32,
        global_transaction_id: &[u8],
        branch_qualifier: &[u8],
    ) -> Result<Self, XaError> {
        if global_transaction_id.len() > Self::MAXGTRIDSIZE {
            return Err(XaError::InvalidXid(format!(
                "global transaction id is {} bytes, limit is {}",
                global_transaction_id.len(),
                Self::MAXGTRIDSIZE
            )));
        }
        if branch_qualifier.len() > Self::MAXBQUALSIZE {
            return Err(XaError::InvalidXid(format!(
                "branch qualifier is {} bytes, limit is {}",
                branch_qualifier.len(),
                Self::MAXBQUALSIZE
            )));
        }
        Ok(Self {
            format_id,
            global_transaction_id: global_transaction_id.to_vec(),
            branch_qualifier: branch_qualifier.to_vec(),
        })
    }

    /// Format identifier
    pub fn format_id(&self) -> i32 {
        self.format_id
    }

    /// Global transaction id bytes
    pub fn global_transaction_id(&self) -> &[u8] {
        &self.global_transaction_id
    }

    /// Branch qualifier bytes
    pub fn branch_qualifier(&self) -> &[u8] {
        &self.branch_qualifier
    }
}

impl fmt::Display for Xid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:", self.format_id)?;
        for b in &self.global_transaction_id {
            write!(f, "{:02x}", b)?;
        }
        f.write_str(":")?;
        for b in &self.branch_qualifier {
            write!(f, "{:02x}", b)?;
        }
        Ok(())
    }
}

/// Flags passed to `start`/`end`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum XaFlags {
    /// TMNOFLAGS: start a new branch association
    NoFlags,
    /// TMJOIN: join an existing branch
    Join,
    /// TMRESUME: resume a suspended association
    Resume,
    /// TMSUCCESS: work completed successfully
    Success,
    /// TMFAIL: work failed, branch is rollback-only
    Fail,
    /// TMSUSPEND: association suspended
    Suspend,
}

impl XaFlags {
    /// Raw X/Open flag value
    pub fn bits(&self) -> i32 {
        match self {
            XaFlags::NoFlags => 0x0000_0000,
            XaFlags::Join => 0x0020_0000,
            XaFlags::Resume => 0x0800_0000,
            XaFlags::Success => 0x0400_0000,
            XaFlags::Fail => 0x2000_0000,
            XaFlags::Suspend => 0x0200_0000,
        }
    }
}

/// How a resource-manager handle is delisted from a transaction
///
/// Configurable through `ProxyOptions::delist_flag`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DelistFlag {
    /// Work done so far is complete and may be committed
    #[default]
    Success,
    /// Work failed; the transaction must roll back
    Fail,
    /// Association is suspended and may be resumed later
    Suspend,
}

impl DelistFlag {
    /// The `end` flag this delist translates to
    pub fn as_xa_flags(&self) -> XaFlags {
        match self {
            DelistFlag::Success => XaFlags::Success,
            DelistFlag::Fail => XaFlags::Fail,
            DelistFlag::Suspend => XaFlags::Suspend,
        }
    }
}

/// Outcome of the prepare phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Vote {
    /// Prepared, ready to commit (XA_OK)
    Commit,
    /// Branch did no updates and is already complete (XA_RDONLY)
    ReadOnly,
}

/// Failure reported by a resource-manager handle
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum XaError {
    /// The branch was rolled back by the resource manager
    #[error("branch rolled back: {0}")]
    RolledBack(String),
    /// Call made in the wrong branch state
    #[error("protocol error: {0}")]
    Protocol(String),
    /// Resource manager failure
    #[error("resource manager error: {0}")]
    ResourceManager(String),
    /// Branch id outside the XA size limits
    #[error("invalid xid: {0}")]
    InvalidXid(String),
}

/// Transactional control surface of a session or context
///
/// Shared between the proxy that enlisted it and the coordinator that drives
/// two-phase commit against it; hence `Send + Sync` and held in an `Arc`.
pub trait XaResource: Send + Sync + fmt::Debug {
    /// Identity of the resource manager behind this handle
    fn resource_manager_id(&self) -> &str;

    /// Associate the handle with a branch
    fn start(&self, xid: &Xid, flags: XaFlags) -> Result<(), XaError>;

    /// End the association with a branch
    fn end(&self, xid: &Xid, flags: XaFlags) -> Result<(), XaError>;

    /// Vote on the branch outcome
    fn prepare(&self, xid: &Xid) -> Result<Vote, XaError>;

    /// Commit the branch
    fn commit(&self, xid: &Xid, one_phase: bool) -> Result<(), XaError>;

    /// Roll the branch back
    fn rollback(&self, xid: &Xid) -> Result<(), XaError>;
}
