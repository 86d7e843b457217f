//! Shared key generation for storage backends.

use uuid::Uuid;

fn document_prefix(owner_id: Uuid, document_id: Uuid) -> String {
    format!("documents/{}/{}", owner_id, document_id)
}

/// Key of the untouched upload.
pub fn original_key(owner_id: Uuid, document_id: Uuid) -> String {
    format!("{}/original.pdf", document_prefix(owner_id, document_id))
}

/// Fresh key for a signed variant; `revision` keeps successive signatures apart.
pub fn signed_key(owner_id: Uuid, document_id: Uuid, revision: Uuid) -> String {
    format!(
        "{}/signed-{}.pdf",
        document_prefix(owner_id, document_id),
        revision.simple()
    )
}
