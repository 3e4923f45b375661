//! Breadcrumb formatting for ancestor chains.

use crate::models::Topic;

pub const PATH_SEPARATOR: &str = " > ";

/// Join the chain's names in the given order.
pub fn format(chain: &[Topic]) -> String {
    chain
        .iter()
        .map(|topic| topic.name.as_str())
        .collect::<Vec<_>>()
        .join(PATH_SEPARATOR)
}

/// Number of hops from the first element to the last.
pub fn depth_of(chain: &[Topic]) -> usize {
    chain.len().saturating_sub(1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TopicKind;

    fn topic(id: i64, name: &str, kind: TopicKind) -> Topic {
        Topic {
            id,
            name: name.to_string(),
            kind,
            deleted: false,
            created_at: String::new(),
            updated_at: String::new(),
            version: 1,
        }
    }

    #[test]
    fn test_format_chain() {
        let chain = vec![
            topic(1, "Science", TopicKind::Root),
            topic(
                2,
                "Physics",
                TopicKind::Child {
                    parent_id: 1,
                    level: 1,
                },
            ),
            topic(
                3,
                "Quantum",
                TopicKind::Child {
                    parent_id: 2,
                    level: 2,
                },
            ),
        ];

        assert_eq!(format(&chain), "Science > Physics > Quantum");
        assert_eq!(depth_of(&chain), 2);
    }

    #[test]
    fn test_single_element_chain() {
        let chain = vec![topic(1, "Science", TopicKind::Root)];
        assert_eq!(format(&chain), "Science");
        assert_eq!(depth_of(&chain), 0);
    }

    #[test]
    fn test_empty_chain() {
        assert_eq!(format(&[]), "");
        assert_eq!(depth_of(&[]), 0);
    }
}
