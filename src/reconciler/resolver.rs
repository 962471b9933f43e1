//! Symbolic reference resolution.
//!
//! Routine inputs and outputs name asset attributes either symbolically,
//! as `local.{{Tank1}}` plus an attribute name, or concretely by id. This
//! module rewrites symbolic addresses into id pairs using the state as the
//! name-to-id map, and checks that concrete ids still point at something.

use tracing::debug;

use crate::error::{ReconcileError, Result, SolutionError};
use crate::model::{
    is_identifier, Asset, Component, DataAddress, DataAddressValue, InputDataAddress,
    ReferenceScope, RoutineObject, Solution,
};

/// What to do with a named asset or attribute that has no id yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    /// Leave the address symbolic; it is resolved again before its routine is applied.
    Defer,
    /// Fail.
    Strict,
}

/// Where an address appears, for error messages.
#[derive(Debug, Clone, Copy)]
struct Site<'a> {
    component: &'a str,
    routine: &'a str,
    element: &'a str,
}

impl Site<'_> {
    fn describe(&self) -> String {
        format!(
            "'{}' of routine '{}' in component '{}'",
            self.element, self.routine, self.component
        )
    }
}

/// Resolves data addresses against a snapshot of the state's assets.
#[derive(Debug, Clone, Default)]
pub struct ReferenceResolver {
    local: Vec<Asset>,
    imported: Vec<Asset>,
}

impl ReferenceResolver {
    /// Snapshots the assets of `state`.
    #[must_use]
    pub fn new(state: &Solution) -> Self {
        Self {
            local: state.assets.clone(),
            imported: state.imported_assets.clone(),
        }
    }

    /// Resolves every routine of every component in `state`, in place.
    ///
    /// Addresses naming an asset or attribute that exists but has not been
    /// created yet are left symbolic. Returns how many were left.
    ///
    /// # Errors
    ///
    /// Returns [`ReconcileError::UndefinedId`] for a reference that cannot be
    /// resolved, or [`ReconcileError::InvalidReferenceValue`] for a value of
    /// the wrong shape.
    pub fn replace_references(state: &mut Solution) -> Result<usize> {
        let resolver = Self::new(state);
        let mut deferred = 0;

        for component in state
            .components
            .iter_mut()
            .chain(state.imported_components.iter_mut())
        {
            deferred += resolver.resolve_component(component)?;
        }

        debug!("Reference resolution left {deferred} addresses pending creation");
        Ok(deferred)
    }

    fn resolve_component(&self, component: &mut Component) -> Result<usize> {
        let mut deferred = 0;
        for routine in &mut component.routines {
            deferred += self.resolve_routine_with(&component.name, routine, Mode::Defer)?;
        }
        Ok(deferred)
    }

    /// Resolves one routine, failing on anything that is still unresolvable.
    ///
    /// # Errors
    ///
    /// Returns [`ReconcileError::NotCreated`] when a referenced attribute has
    /// no id yet, [`ReconcileError::UndefinedId`] or
    /// [`ReconcileError::InvalidReferenceValue`].
    pub fn resolve_routine(&self, component: &str, routine: &mut RoutineObject) -> Result<()> {
        self.resolve_routine_with(component, routine, Mode::Strict).map(|_| ())
    }

    /// Resolves a single address outside of any routine.
    ///
    /// # Errors
    ///
    /// Returns [`ReconcileError::UndefinedId`] if the address cannot be resolved.
    pub fn resolve(&self, address: &DataAddress) -> Result<DataAddress> {
        let site = Site {
            component: "-",
            routine: "-",
            element: "-",
        };
        self.resolve_address(address, &site, Mode::Strict)
            .map(|resolved| resolved.unwrap_or_else(|| address.clone()))
    }

    fn resolve_routine_with(&self, component: &str, routine: &mut RoutineObject, mode: Mode) -> Result<usize> {
        let mut deferred = 0;
        let routine_name = routine.name.clone();

        for element in routine.input.iter_mut().chain(routine.output.iter_mut()) {
            let site = Site {
                component,
                routine: &routine_name,
                element: &element.name,
            };
            let (value, pending) = self.resolve_element(element.clone(), &site, mode)?;
            element.value = value;
            deferred += pending;
        }

        Ok(deferred)
    }

    /// Resolves the value of one element, returning the new value and the pending count.
    fn resolve_element(
        &self,
        element: InputDataAddress,
        site: &Site<'_>,
        mode: Mode,
    ) -> Result<(Option<DataAddressValue>, usize)> {
        let Some(value) = element.value else {
            return Ok((None, 0));
        };

        match (element.multiple, value) {
            (true, DataAddressValue::Many(addresses)) => {
                let mut pending = 0;
                let mut resolved = Vec::with_capacity(addresses.len());
                for address in addresses {
                    match self.resolve_address(&address, site, mode)? {
                        Some(concrete) => resolved.push(concrete),
                        None => {
                            pending += 1;
                            resolved.push(address);
                        }
                    }
                }
                Ok((Some(DataAddressValue::Many(resolved)), pending))
            }
            (false, DataAddressValue::Single(address)) => match self.resolve_address(&address, site, mode)? {
                Some(concrete) => Ok((Some(DataAddressValue::Single(concrete)), 0)),
                None => Ok((Some(DataAddressValue::Single(address)), 1)),
            },
            (true, DataAddressValue::Single(_)) => Err(invalid_value(site, "expected a list of data addresses")),
            (false, DataAddressValue::Many(_)) => Err(invalid_value(site, "expected a single data address")),
        }
    }

    /// Resolves one address. `None` means it was deferred.
    fn resolve_address(&self, address: &DataAddress, site: &Site<'_>, mode: Mode) -> Result<Option<DataAddress>> {
        let Some(symbolic) = address.symbolic_asset() else {
            return self.validate_ids(address, site).map(|()| Some(address.clone()));
        };

        let assets = match symbolic.known_scope() {
            Some(ReferenceScope::Local) => &self.local,
            Some(ReferenceScope::Imported) => &self.imported,
            None => {
                return Err(undefined(format!(
                    "unknown scope '{}' in asset reference '{}' of {}",
                    symbolic.scope,
                    address.asset,
                    site.describe()
                )));
            }
        };

        let asset = assets.iter().find(|a| a.name == symbolic.name).ok_or_else(|| {
            undefined(format!(
                "asset '{}' (scope '{}') referenced by {} does not exist",
                symbolic.name,
                symbolic.scope,
                site.describe()
            ))
        })?;

        let attribute = asset.attribute(&address.attribute).ok_or_else(|| {
            undefined(format!(
                "attribute '{}' of asset '{}' referenced by {} does not exist",
                address.attribute,
                asset.name,
                site.describe()
            ))
        })?;

        match (&asset.id, &attribute.id) {
            (Some(asset_id), Some(attribute_id)) => Ok(Some(DataAddress::new(asset_id, attribute_id))),
            _ if mode == Mode::Defer => {
                debug!(
                    "Deferring {}.{} for {}: not created yet",
                    asset.name,
                    attribute.name,
                    site.describe()
                );
                Ok(None)
            }
            _ => Err(SolutionError::Reconcile(ReconcileError::not_created(format!(
                "attribute '{}' of asset '{}' referenced by {} has not been created remotely",
                attribute.name,
                asset.name,
                site.describe()
            )))),
        }
    }

    /// Checks that a concrete id pair names a known asset attribute.
    fn validate_ids(&self, address: &DataAddress, site: &Site<'_>) -> Result<()> {
        if !is_identifier(&address.asset) || !is_identifier(&address.attribute) {
            return Err(undefined(format!(
                "'{}'/'{}' referenced by {} is neither a symbolic reference nor an id pair",
                address.asset,
                address.attribute,
                site.describe()
            )));
        }

        let asset = self
            .local
            .iter()
            .chain(&self.imported)
            .find(|a| a.id.as_deref() == Some(address.asset.as_str()))
            .ok_or_else(|| {
                undefined(format!(
                    "asset id '{}' referenced by {} is not in the state",
                    address.asset,
                    site.describe()
                ))
            })?;

        if asset
            .attributes
            .iter()
            .any(|a| a.id.as_deref() == Some(address.attribute.as_str()))
        {
            Ok(())
        } else {
            Err(undefined(format!(
                "attribute id '{}' of asset '{}' referenced by {} is not in the state",
                address.attribute,
                asset.name,
                site.describe()
            )))
        }
    }
}

fn undefined(message: String) -> SolutionError {
    SolutionError::Reconcile(ReconcileError::undefined(message))
}

fn invalid_value(site: &Site<'_>, reason: &str) -> SolutionError {
    SolutionError::Reconcile(ReconcileError::InvalidReferenceValue {
        component: site.component.to_string(),
        routine: site.routine.to_string(),
        element: site.element.to_string(),
        reason: reason.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Attribute;

    fn state_with_tank() -> Solution {
        Solution {
            assets: vec![Asset::new("Tank1")
                .with_id("A1")
                .with_attribute(Attribute::new("temperature", "number").with_id("T1"))],
            imported_assets: vec![Asset::new("Boiler")
                .with_id("B1")
                .with_attribute(Attribute::new("pressure", "number").with_id("P1"))],
            ..Solution::default()
        }
    }

    fn element(name: &str, multiple: bool, value: DataAddressValue) -> InputDataAddress {
        InputDataAddress {
            name: name.to_string(),
            required: true,
            multiple,
            value: Some(value),
        }
    }

    fn with_routine(mut state: Solution, routine: RoutineObject) -> Solution {
        state.components.push(Component::new("pump").with_routine(routine));
        state
    }

    #[test]
    fn test_local_reference_resolves_to_ids() {
        let resolver = ReferenceResolver::new(&state_with_tank());
        let resolved = resolver
            .resolve(&DataAddress::local("Tank1", "temperature"))
            .expect("resolve");
        assert_eq!(resolved, DataAddress::new("A1", "T1"));
    }

    #[test]
    fn test_unknown_attribute_is_undefined() {
        let resolver = ReferenceResolver::new(&state_with_tank());
        let err = resolver.resolve(&DataAddress::local("Tank1", "humidity")).unwrap_err();
        assert!(matches!(err, SolutionError::Reconcile(ReconcileError::UndefinedId { .. })));
        assert!(err.to_string().contains("humidity"));
    }

    #[test]
    fn test_imported_scope_uses_imported_assets() {
        let resolver = ReferenceResolver::new(&state_with_tank());
        let address = DataAddress::new("imported.{{Boiler}}", "pressure");
        assert_eq!(resolver.resolve(&address).expect("resolve"), DataAddress::new("B1", "P1"));
    }

    #[test]
    fn test_local_scope_ignores_imported_assets() {
        let resolver = ReferenceResolver::new(&state_with_tank());
        assert!(resolver.resolve(&DataAddress::local("Boiler", "pressure")).is_err());
    }

    #[test]
    fn test_id_mode_validates_against_state() {
        let resolver = ReferenceResolver::new(&state_with_tank());
        assert!(resolver.resolve(&DataAddress::new("A1", "T1")).is_ok());
        assert!(resolver.resolve(&DataAddress::new("B1", "P1")).is_ok());
        assert!(resolver.resolve(&DataAddress::new("A1", "P1")).is_err());
        assert!(resolver.resolve(&DataAddress::new("A9", "T1")).is_err());
    }

    #[test]
    fn test_unknown_scope_is_undefined() {
        let resolver = ReferenceResolver::new(&state_with_tank());
        let err = resolver
            .resolve(&DataAddress::new("remote.{{Tank1}}", "temperature"))
            .unwrap_err();
        assert!(err.to_string().contains("unknown scope 'remote'"));
    }

    #[test]
    fn test_replace_references_rewrites_routines_in_place() {
        let routine = RoutineObject::new("control").with_input(element(
            "levels",
            true,
            DataAddressValue::Many(vec![
                DataAddress::local("Tank1", "temperature"),
                DataAddress::new("imported.{{Boiler}}", "pressure"),
            ]),
        ));
        let mut state = with_routine(state_with_tank(), routine);

        let deferred = ReferenceResolver::replace_references(&mut state).expect("replace");

        assert_eq!(deferred, 0);
        assert_eq!(
            state.components[0].routines[0].input[0].value,
            Some(DataAddressValue::Many(vec![
                DataAddress::new("A1", "T1"),
                DataAddress::new("B1", "P1"),
            ]))
        );
    }

    #[test]
    fn test_multiple_requires_a_list() {
        let routine = RoutineObject::new("control").with_input(element(
            "levels",
            true,
            DataAddressValue::Single(DataAddress::local("Tank1", "temperature")),
        ));
        let mut state = with_routine(state_with_tank(), routine);

        let err = ReferenceResolver::replace_references(&mut state).unwrap_err();
        assert!(matches!(
            err,
            SolutionError::Reconcile(ReconcileError::InvalidReferenceValue { ref element, .. }) if element == "levels"
        ));
    }

    #[test]
    fn test_uncreated_asset_is_deferred_then_strict() {
        let mut state = state_with_tank();
        state
            .assets
            .push(Asset::new("Tank2").with_attribute(Attribute::new("level", "number")));
        let routine = RoutineObject::new("control").with_input(element(
            "level",
            false,
            DataAddressValue::Single(DataAddress::local("Tank2", "level")),
        ));
        let mut state = with_routine(state, routine);

        let deferred = ReferenceResolver::replace_references(&mut state).expect("replace");
        assert_eq!(deferred, 1);
        assert_eq!(
            state.components[0].routines[0].input[0].value,
            Some(DataAddressValue::Single(DataAddress::local("Tank2", "level")))
        );

        let resolver = ReferenceResolver::new(&state);
        let mut routine = state.components[0].routines[0].clone();
        let err = resolver.resolve_routine("pump", &mut routine).unwrap_err();
        assert!(matches!(err, SolutionError::Reconcile(ReconcileError::NotCreated { .. })));
        assert!(err.to_string().contains("has not been created remotely"));
    }

    #[test]
    fn test_error_names_routine_and_component() {
        let routine = RoutineObject::new("control").with_input(element(
            "level",
            false,
            DataAddressValue::Single(DataAddress::local("Tank9", "level")),
        ));
        let mut state = with_routine(state_with_tank(), routine);

        let message = ReferenceResolver::replace_references(&mut state)
            .unwrap_err()
            .to_string();
        assert!(message.contains("Tank9"));
        assert!(message.contains("routine 'control'"));
        assert!(message.contains("component 'pump'"));
    }
}
