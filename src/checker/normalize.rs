//! Deep normalization of checker types
//!
//! Mirrors the injected `DeepNormalize` utility: object intersections merge
//! into one object, brand markers disappear, and opaque built-ins (dates,
//! regexps, promises, maps, sets, functions) are left exactly as they are.

use super::types::{intersection, union, Property, TsType};

pub fn deep_normalize(ty: &TsType) -> TsType {
    match ty {
        TsType::Object(props) => TsType::Object(
            props
                .iter()
                .map(|p| Property {
                    ty: deep_normalize(&p.ty),
                    ..p.clone()
                })
                .collect(),
        ),
        TsType::Record { key, value } => TsType::Record {
            key: key.clone(),
            value: Box::new(deep_normalize(value)),
        },
        TsType::Array { element, readonly } => TsType::Array {
            element: Box::new(deep_normalize(element)),
            readonly: *readonly,
        },
        TsType::Tuple {
            items,
            rest,
            readonly,
        } => TsType::Tuple {
            items: items.iter().map(deep_normalize).collect(),
            rest: rest.as_ref().map(|r| Box::new(deep_normalize(r))),
            readonly: *readonly,
        },
        TsType::Union(members) => union(members.iter().map(deep_normalize).collect()),
        TsType::Intersection(members) => normalize_intersection(members),
        TsType::Brand(_) => TsType::Object(Vec::new()),
        other => other.clone(),
    }
}

fn normalize_intersection(members: &[TsType]) -> TsType {
    let members: Vec<TsType> = members
        .iter()
        .filter(|m| !matches!(m, TsType::Brand(_)))
        .map(deep_normalize)
        .collect();

    if members.iter().all(|m| matches!(m, TsType::Object(_))) {
        let mut merged: Vec<Property> = Vec::new();
        for member in members {
            let TsType::Object(props) = member else {
                continue;
            };
            for prop in props {
                match merged.iter_mut().find(|p| p.name == prop.name) {
                    Some(existing) => *existing = prop,
                    None => merged.push(prop),
                }
            }
        }
        return TsType::Object(merged);
    }

    // A union distributed over an object intersection normalizes per member
    if let Some(pos) = members.iter().position(|m| matches!(m, TsType::Union(_))) {
        let TsType::Union(options) = &members[pos] else {
            return intersection(members);
        };
        let distributed = options
            .iter()
            .map(|option| {
                let mut parts = members.clone();
                parts[pos] = option.clone();
                normalize_intersection(&parts)
            })
            .collect();
        return union(distributed);
    }

    intersection(members)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merges_object_intersections() {
        let ty = TsType::Intersection(vec![
            TsType::Object(vec![
                Property::new("a", TsType::String),
                Property::new("b", TsType::Number),
            ]),
            TsType::Object(vec![Property::new("b", TsType::Boolean)]),
        ]);
        assert_eq!(deep_normalize(&ty).to_string(), "{ a: string; b: boolean; }");
    }

    #[test]
    fn test_strips_brands() {
        let ty = TsType::Intersection(vec![TsType::String, TsType::Brand("UserId".into())]);
        assert_eq!(deep_normalize(&ty), TsType::String);

        let object = TsType::Intersection(vec![
            TsType::Object(vec![Property::new("id", TsType::String)]),
            TsType::Brand("User".into()),
        ]);
        assert_eq!(deep_normalize(&object).to_string(), "{ id: string; }");
    }

    #[test]
    fn test_leaves_opaque_types() {
        let ty = TsType::generic(
            "Promise",
            vec![TsType::Intersection(vec![
                TsType::String,
                TsType::Brand("X".into()),
            ])],
        );
        assert_eq!(deep_normalize(&ty), ty);
    }

    #[test]
    fn test_distributes_union_over_intersection() {
        let ty = TsType::Intersection(vec![
            TsType::Object(vec![Property::new("a", TsType::String)]),
            TsType::Union(vec![
                TsType::Object(vec![Property::new("b", TsType::Number)]),
                TsType::Object(vec![Property::new("c", TsType::Number)]),
            ]),
        ]);
        assert_eq!(
            deep_normalize(&ty).to_string(),
            "{ a: string; b: number; } | { a: string; c: number; }"
        );
    }
}
