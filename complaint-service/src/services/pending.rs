use crate::models::{ComplaintEntry, ComplaintGroup, PENDING_STATUS};

/// Outcome of scanning the administrative collection for pending entries.
#[derive(Debug, PartialEq)]
pub enum PendingComplaints {
    /// The collection holds no documents at all.
    NoComplaints,
    /// Documents exist but none embeds a pending entry.
    NonePending,
    Found(Vec<ComplaintEntry>),
}

/// Flatten every entry whose status is exactly `Pending`, keeping document
/// order and then array order.
pub fn collect_pending(groups: Vec<ComplaintGroup>) -> PendingComplaints {
    if groups.is_empty() {
        return PendingComplaints::NoComplaints;
    }

    let pending: Vec<ComplaintEntry> = groups
        .into_iter()
        .flat_map(|group| group.complaints)
        .filter(|entry| entry.has_status(PENDING_STATUS))
        .collect();

    if pending.is_empty() {
        PendingComplaints::NonePending
    } else {
        PendingComplaints::Found(pending)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn entry(id: &str, status: Option<&str>) -> ComplaintEntry {
        match status {
            Some(status) => ComplaintEntry(json!({ "id": id, "status": status })),
            None => ComplaintEntry(json!({ "id": id })),
        }
    }

    fn group(entries: Vec<ComplaintEntry>) -> ComplaintGroup {
        ComplaintGroup {
            complaints: entries,
        }
    }

    #[test]
    fn empty_collection_has_no_complaints() {
        assert_eq!(collect_pending(vec![]), PendingComplaints::NoComplaints);
    }

    #[test]
    fn documents_without_pending_entries() {
        let groups = vec![
            group(vec![entry("a", Some("Resolved"))]),
            group(vec![]),
            group(vec![entry("b", None)]),
        ];
        assert_eq!(collect_pending(groups), PendingComplaints::NonePending);
    }

    #[test]
    fn entries_of_unexpected_shape_are_skipped() {
        let groups = vec![group(vec![
            ComplaintEntry(json!({ "status": 3 })),
            ComplaintEntry(json!("legacy")),
            entry("a", Some("Pending")),
        ])];

        assert_eq!(
            collect_pending(groups),
            PendingComplaints::Found(vec![entry("a", Some("Pending"))])
        );
    }

    #[test]
    fn status_match_is_exact_and_case_sensitive() {
        let groups = vec![group(vec![
            entry("a", Some("pending")),
            entry("b", Some("PENDING")),
            entry("c", Some("Pending ")),
            entry("d", Some("Pending")),
        ])];

        assert_eq!(
            collect_pending(groups),
            PendingComplaints::Found(vec![entry("d", Some("Pending"))])
        );
    }

    #[test]
    fn matches_are_flattened_in_document_order() {
        let groups = vec![
            group(vec![entry("a", Some("Pending")), entry("b", Some("Closed"))]),
            group(vec![entry("c", Some("Pending")), entry("d", Some("Pending"))]),
        ];

        let PendingComplaints::Found(found) = collect_pending(groups) else {
            panic!("expected pending entries");
        };
        let ids: Vec<_> = found.iter().map(|e| e.0["id"].clone()).collect();
        assert_eq!(ids, vec![json!("a"), json!("c"), json!("d")]);
    }
}
