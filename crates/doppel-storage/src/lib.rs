// SPDX-FileCopyrightText: 2026 Doppel Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Persistence sidecars: PII masking, the audit log, the in-memory event
//! buffer, and the JSONL conversation log.

pub mod audit;
pub mod conversation_log;
pub mod events;
pub mod privacy;

pub use audit::{AuditEntry, AuditLog};
pub use conversation_log::{ConversationLog, LogRecord};
pub use events::{EventBuffer, PipelineEvent};
pub use privacy::mask_pii;
