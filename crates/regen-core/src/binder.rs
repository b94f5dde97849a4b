//! # Command Parameter Binder
//!
//! Classifies the parameters of an operation and pairs every array
//! parameter with the parameter (or record member) holding its length.
//!
//! Binding runs at most once per operation: the `bound` flag turns a second
//! call into a no-op. An unresolvable `len` leaves the array unbound, which
//! keeps it out of bulk variant synthesis.

use crate::diagnostics::{Diagnostic, Diagnostics};
use crate::entity::{Category, LengthBinding, Operation, ParamFlags, Parameter};
use crate::store::EntityStore;
use crate::types::{EntityId, RegenError};

/// `len` value marking a null-terminated string.
const NULL_TERMINATED: &str = "null-terminated";

/// Statistics of a binding run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BindReport {
    /// Operations bound by this run.
    pub bound: usize,
    /// Array parameters left unbound.
    pub failures: usize,
}

pub struct Binder;

impl Binder {
    /// Bind every emit-eligible operation.
    pub fn bind_required(
        store: &mut EntityStore,
        diagnostics: &mut Diagnostics,
    ) -> Result<BindReport, RegenError> {
        let ids: Vec<EntityId> = store
            .of_category(Category::Command)
            .filter(|e| e.is_emit_eligible())
            .map(|e| e.id)
            .collect();
        let mut report = BindReport::default();
        for id in ids {
            if let Some(failures) = Self::bind(store, id, diagnostics)? {
                report.bound += 1;
                report.failures += failures;
            }
        }
        tracing::debug!(bound = report.bound, failures = report.failures, "operations bound");
        Ok(report)
    }

    /// Bind one operation.
    ///
    /// Returns the number of unbound arrays, or `None` if the entity is not
    /// an operation or was already bound.
    pub fn bind(
        store: &mut EntityStore,
        id: EntityId,
        diagnostics: &mut Diagnostics,
    ) -> Result<Option<usize>, RegenError> {
        let entity = store.get(id)?;
        let Some(op) = entity.as_operation() else {
            return Ok(None);
        };
        if op.bound {
            return Ok(None);
        }
        let name = entity.name.original.clone();
        let mut op = op.clone();

        Self::classify(store, &mut op);
        let failures = Self::pair_lengths(store, &name, &mut op, diagnostics);
        op.bound = true;

        if let Some(slot) = store.get_mut(id)?.as_operation_mut() {
            *slot = op;
        }
        Ok(Some(failures))
    }

    fn classify(store: &EntityStore, op: &mut Operation) {
        for param in &mut op.params {
            let mut flags = ParamFlags::empty();
            if param.ty.pointers > 0 && !param.ty.is_const {
                flags |= ParamFlags::OUTPUT;
            } else {
                flags |= ParamFlags::INPUT;
            }
            if param.optional {
                flags |= ParamFlags::OPTIONAL;
            }
            match param.len.as_deref().map(first_token) {
                Some(NULL_TERMINATED) => flags |= ParamFlags::STRING,
                Some(_) => flags |= ParamFlags::ARRAY,
                None => {}
            }
            match param.ty.entity.and_then(|e| store.entity(e)).map(|e| e.category()) {
                Some(Category::Record) => flags |= ParamFlags::STRUCT,
                Some(Category::Handle) => flags |= ParamFlags::HANDLE,
                _ => {}
            }
            param.flags = flags;
        }
    }

    /// Resolve every array's `len`; returns the number of failures.
    fn pair_lengths(
        store: &EntityStore,
        operation: &str,
        op: &mut Operation,
        diagnostics: &mut Diagnostics,
    ) -> usize {
        let mut failures = 0;
        for index in 0..op.params.len() {
            if !op.params[index].is_array() {
                continue;
            }
            let Some(len) = op.params[index].len.clone() else {
                continue;
            };
            let token = first_token(&len);

            let binding = match token.split_once("->") {
                Some((param, member)) => op
                    .params
                    .iter()
                    .position(|p| p.name == param)
                    .filter(|&j| Self::has_member(store, &op.params, j, member))
                    .map(|j| LengthBinding::Member {
                        param: j,
                        member: member.to_string(),
                    }),
                None => op
                    .params
                    .iter()
                    .position(|p| p.name == token)
                    .filter(|&j| j != index)
                    .map(LengthBinding::Param),
            };

            match binding {
                Some(LengthBinding::Param(j)) => {
                    op.params[j].sizes.insert(index);
                    op.params[j].flags |= ParamFlags::LENGTH;
                    op.params[index].length = Some(LengthBinding::Param(j));
                }
                Some(member) => op.params[index].length = Some(member),
                None => {
                    failures += 1;
                    diagnostics.push(Diagnostic::BindingFailure {
                        operation: operation.to_string(),
                        parameter: op.params[index].name.clone(),
                        len,
                    });
                }
            }
        }
        failures
    }

    fn has_member(store: &EntityStore, params: &[Parameter], param: usize, member: &str) -> bool {
        params
            .get(param)
            .and_then(|p| p.ty.entity)
            .and_then(|e| store.entity(e))
            .and_then(|e| e.as_record())
            .is_some_and(|r| r.members.iter().any(|m| m.name == member))
    }
}

/// First comma-separated element of a `len` attribute.
fn first_token(len: &str) -> &str {
    len.split(',').next().unwrap_or(len).trim()
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::{EntityKind, Member, OperationClass, Record};
    use crate::types::{EntityName, TypeRef};

    fn param(name: &str, ty: &str, pointers: u8, len: Option<&str>) -> Parameter {
        let mut ty = TypeRef::named(ty);
        ty.pointers = pointers;
        let mut param = Parameter::new(name, name, ty);
        param.len = len.map(str::to_string);
        param
    }

    fn operation(params: Vec<Parameter>) -> EntityKind {
        EntityKind::Command(Operation {
            params,
            return_type: TypeRef::named("void"),
            success_codes: Vec::new(),
            error_codes: Vec::new(),
            class: OperationClass::Unknown,
            owner: None,
            bound: false,
        })
    }

    fn op(store: &EntityStore, id: EntityId) -> &Operation {
        store
            .get(id)
            .expect("entity")
            .as_operation()
            .expect("operation")
    }

    #[test]
    fn shared_length_binds_many_arrays() {
        let mut store = EntityStore::new();
        let id = store
            .insert(
                EntityName::verbatim("vkCmdBindVertexBuffers"),
                operation(vec![
                    param("bindingCount", "uint32_t", 0, None),
                    param("pBuffers", "VkBuffer", 1, Some("bindingCount")),
                    param("pOffsets", "VkDeviceSize", 1, Some("bindingCount")),
                ]),
            )
            .expect("insert");
        let mut diagnostics = Diagnostics::new();
        let failures = Binder::bind(&mut store, id, &mut diagnostics).expect("bind");
        assert_eq!(failures, Some(0));

        let op = op(&store, id);
        assert!(op.bound);
        assert_eq!(op.params[1].length, Some(LengthBinding::Param(0)));
        assert_eq!(op.params[2].length, Some(LengthBinding::Param(0)));
        assert_eq!(op.params[0].sizes.len(), 2);
        assert!(op.params[0].flags.contains(ParamFlags::LENGTH));
        assert!(op.is_length(0));
    }

    #[test]
    fn output_count_and_array_are_classified() {
        let mut store = EntityStore::new();
        let id = store
            .insert(
                EntityName::verbatim("vkEnumerateWidgets"),
                operation(vec![
                    param("pCount", "uint32_t", 1, None),
                    param("pWidgets", "VkWidget", 1, Some("pCount")),
                ]),
            )
            .expect("insert");
        Binder::bind(&mut store, id, &mut Diagnostics::new()).expect("bind");
        let op = op(&store, id);
        assert!(op.params[0].flags.contains(ParamFlags::OUTPUT | ParamFlags::LENGTH));
        assert!(op.params[1].flags.contains(ParamFlags::OUTPUT | ParamFlags::ARRAY));
        assert_eq!(op.outputs().collect::<Vec<_>>(), vec![0, 1]);
    }

    #[test]
    fn member_lengths_are_validated() {
        let mut store = EntityStore::new();
        let info = store
            .insert(
                EntityName::verbatim("VkAllocateInfo"),
                EntityKind::Record(Record {
                    members: vec![Member {
                        name: "count".to_string(),
                        ty: TypeRef::named("uint32_t"),
                        optional: false,
                        len: None,
                    }],
                    is_union: false,
                    returned_only: false,
                    extends: Vec::new(),
                    structure_type: None,
                }),
            )
            .expect("insert");
        let mut info_param = param("pAllocateInfo", "VkAllocateInfo", 1, None);
        info_param.ty.is_const = true;
        info_param.ty.entity = Some(info);
        let id = store
            .insert(
                EntityName::verbatim("vkAllocateThings"),
                operation(vec![
                    info_param,
                    param("pThings", "VkThing", 1, Some("pAllocateInfo->count")),
                    param("pOthers", "VkThing", 1, Some("pAllocateInfo->missing")),
                ]),
            )
            .expect("insert");
        let mut diagnostics = Diagnostics::new();
        let failures = Binder::bind(&mut store, id, &mut diagnostics).expect("bind");
        assert_eq!(failures, Some(1));
        assert_eq!(diagnostics.len(), 1);

        let op = op(&store, id);
        assert!(op.params[0].flags.contains(ParamFlags::STRUCT | ParamFlags::INPUT));
        assert_eq!(
            op.params[1].length,
            Some(LengthBinding::Member {
                param: 0,
                member: "count".to_string()
            })
        );
        assert_eq!(op.params[2].length, None);
        assert!(op.params[2].is_array());
    }

    #[test]
    fn strings_and_expressions() {
        let mut store = EntityStore::new();
        let mut name = param("pName", "char", 1, Some("null-terminated"));
        name.ty.is_const = true;
        let id = store
            .insert(
                EntityName::verbatim("vkSetName"),
                operation(vec![
                    name,
                    param("pMask", "uint32_t", 1, Some("(samples + 31) / 32")),
                ]),
            )
            .expect("insert");
        let mut diagnostics = Diagnostics::new();
        Binder::bind(&mut store, id, &mut diagnostics).expect("bind");
        let op = op(&store, id);
        assert!(op.params[0].flags.contains(ParamFlags::STRING));
        assert!(!op.params[0].is_array());
        assert_eq!(op.params[1].length, None);
        assert!(matches!(
            diagnostics.iter().next(),
            Some(Diagnostic::BindingFailure { parameter, .. }) if parameter == "pMask"
        ));
    }

    #[test]
    fn rebinding_is_a_noop() {
        let mut store = EntityStore::new();
        let id = store
            .insert(
                EntityName::verbatim("vkBadLen"),
                operation(vec![param("pData", "void", 1, Some("missingSize"))]),
            )
            .expect("insert");
        let mut diagnostics = Diagnostics::new();
        assert_eq!(
            Binder::bind(&mut store, id, &mut diagnostics).expect("bind"),
            Some(1)
        );
        let snapshot = op(&store, id).clone();
        assert_eq!(Binder::bind(&mut store, id, &mut diagnostics).expect("bind"), None);
        assert_eq!(op(&store, id), &snapshot);
        assert_eq!(diagnostics.len(), 1);
    }
}
