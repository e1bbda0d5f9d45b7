//! Structural identity comparison over serialized nodes.

use crate::types::SerializedNode;

/// Decide whether a previously mirrored node's identity can be reused.
///
/// This compares identity-defining metadata only. Element child lists are
/// deliberately excluded: two elements with the same tag and attributes but
/// different children are still meta-equal, because the question is "can
/// this node be reused", not "is this subtree unchanged".
pub fn is_node_meta_equal(a: Option<&SerializedNode>, b: Option<&SerializedNode>) -> bool {
    let (Some(a), Some(b)) = (a, b) else {
        return false;
    };
    match (a, b) {
        (
            SerializedNode::Document { compat_mode: a, .. },
            SerializedNode::Document { compat_mode: b, .. },
        ) => a == b,
        (
            SerializedNode::DocumentType {
                name: an,
                public_id: ap,
                system_id: asys,
            },
            SerializedNode::DocumentType {
                name: bn,
                public_id: bp,
                system_id: bsys,
            },
        ) => an == bn && ap == bp && asys == bsys,
        (SerializedNode::Text { text: a }, SerializedNode::Text { text: b })
        | (SerializedNode::Comment { text: a }, SerializedNode::Comment { text: b })
        | (SerializedNode::Cdata { text: a }, SerializedNode::Cdata { text: b }) => a == b,
        (
            SerializedNode::Element {
                tag: at,
                attributes: aa,
                ..
            },
            SerializedNode::Element {
                tag: bt,
                attributes: ba,
                ..
            },
        ) => at == bt && aa == ba,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mirror::MirrorId;
    use crate::types::{Attributes, SerializedNodeWithId};

    fn elem(tag: &str, attrs: &[(&str, &str)], children: Vec<(MirrorId, &str)>) -> SerializedNode {
        SerializedNode::Element {
            tag: tag.to_string(),
            attributes: attrs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect::<Attributes>(),
            children: children
                .into_iter()
                .map(|(id, text)| SerializedNodeWithId {
                    id,
                    node: SerializedNode::Text {
                        text: text.to_string(),
                    },
                })
                .collect(),
        }
    }

    #[test]
    fn reflexive_and_ignores_child_lists() {
        let a = elem("div", &[("class", "a")], vec![(5, "one")]);
        let b = elem("div", &[("class", "a")], vec![(9, "two"), (10, "three")]);
        assert!(is_node_meta_equal(Some(&a), Some(&a)));
        assert!(is_node_meta_equal(Some(&a), Some(&b)));
    }

    #[test]
    fn tag_or_attribute_difference_is_inequality() {
        let a = elem("div", &[("class", "a")], Vec::new());
        assert!(!is_node_meta_equal(
            Some(&a),
            Some(&elem("span", &[("class", "a")], Vec::new()))
        ));
        assert!(!is_node_meta_equal(
            Some(&a),
            Some(&elem("div", &[("class", "b")], Vec::new()))
        ));
        assert!(!is_node_meta_equal(
            Some(&a),
            Some(&elem("div", &[], Vec::new()))
        ));
    }

    #[test]
    fn absent_inputs_and_kind_mismatches_are_unequal() {
        let text = SerializedNode::Text {
            text: "x".to_string(),
        };
        let comment = SerializedNode::Comment {
            text: "x".to_string(),
        };
        assert!(!is_node_meta_equal(None, None));
        assert!(!is_node_meta_equal(Some(&text), None));
        assert!(!is_node_meta_equal(None, Some(&text)));
        assert!(!is_node_meta_equal(Some(&text), Some(&comment)));
    }

    #[test]
    fn per_kind_metadata_decides_equality() {
        let doc_a = SerializedNode::Document {
            compat_mode: "CSS1Compat".to_string(),
            children: Vec::new(),
        };
        let doc_b = SerializedNode::Document {
            compat_mode: "BackCompat".to_string(),
            children: Vec::new(),
        };
        assert!(!is_node_meta_equal(Some(&doc_a), Some(&doc_b)));

        let dt = |sys: &str| SerializedNode::DocumentType {
            name: "html".to_string(),
            public_id: String::new(),
            system_id: sys.to_string(),
        };
        assert!(is_node_meta_equal(Some(&dt("")), Some(&dt(""))));
        assert!(!is_node_meta_equal(Some(&dt("")), Some(&dt("about:legacy-compat"))));
    }
}
