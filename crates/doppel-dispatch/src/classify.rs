// SPDX-FileCopyrightText: 2026 Doppel Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Attachment classification by content type or filename extension.

use doppel_core::Attachment;

const AUDIO_EXTS: &[&str] = &["wav", "mp3", "m4a", "aac", "flac", "ogg"];
const IMAGE_EXTS: &[&str] = &["png", "jpg", "jpeg", "gif", "webp"];

fn extension(filename: &str) -> Option<String> {
    filename.rsplit_once('.').map(|(_, ext)| ext.to_lowercase())
}

pub fn is_audio(attachment: &Attachment) -> bool {
    if let Some(ct) = &attachment.content_type
        && ct.starts_with("audio/")
    {
        return true;
    }
    extension(&attachment.filename)
        .is_some_and(|ext| AUDIO_EXTS.contains(&ext.as_str()))
}

pub fn is_image(attachment: &Attachment) -> bool {
    if let Some(ct) = &attachment.content_type
        && ct.starts_with("image/")
    {
        return true;
    }
    extension(&attachment.filename)
        .is_some_and(|ext| IMAGE_EXTS.contains(&ext.as_str()))
}

/// First audio attachment, if any. Only one voice clip is transcribed
/// per message.
pub fn first_audio(attachments: &[Attachment]) -> Option<&Attachment> {
    attachments.iter().find(|a| is_audio(a))
}

pub fn has_image(attachments: &[Attachment]) -> bool {
    attachments.iter().any(is_image)
}
