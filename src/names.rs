//
// names.rs
// Atlas-Overlap
//
// Display-name cleanup for wildcard-encoded atlas labels and the built-in brainstem label table.
//

/// Fully wildcarded label that matches every path in the hierarchy.
const MATCH_ALL: &str = "*.*.*.*.";

/// Brainstem tract atlas: index in the slice is the region id.
pub const BRAINSTEM_LABELS: [&str; 24] = [
    "Not_in_Atlas",
    "CSTL_Atlas",
    "CSTR_Atlas",
    "FPTL_Atlas",
    "FPTR_Atlas",
    "ICPMCL_Atlas",
    "ICPMCR_Atlas",
    "ICPVCL_Atlas",
    "ICPVCR_Atlas",
    "LLL_Atlas",
    "LLR_Atlas",
    "MCP_Atlas",
    "MLL_Atlas",
    "MLR_Atlas",
    "POTPTL_Atlas",
    "POTPTR_Atlas",
    "SCPCRL_Atlas",
    "SCPCRR_Atlas",
    "SCPCTL_Atlas",
    "SCPCTR_Atlas",
    "SCPSCL_Atlas",
    "SCPSCR_Atlas",
    "STTL_Atlas",
    "STTR_Atlas",
];

/// Collapses hierarchical wildcards (`*.`, `.*`, `*`) into a flat display label.
///
/// The match-everything pattern `*.*.*.*.` becomes `"Background"`.
pub fn normalize_label_name(raw: &str) -> String {
    if raw.trim() == MATCH_ALL {
        return "Background".to_string();
    }

    raw.replace("*.", "")
        .replace(".*", "")
        .replace('*', "")
        .trim()
        .to_string()
}
