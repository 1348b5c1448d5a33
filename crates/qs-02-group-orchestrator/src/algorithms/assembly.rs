//! # Group Authorization
//!
//! Attaches a proof to every leg of a sealed group.
//!
//! Escrow legs are checked locally with the same `Authorizer` the ledger runs,
//! so a group the escrow would refuse never leaves the process.

use crate::domain::{
    ConstructionError, LegAuthorization, LegSigner, SignedGroup, SignedOperation, UnsignedGroup,
};
use crate::ports::AccountSigner;
use qs_01_staking_protocol::Authorizer;

/// Sign account legs and pre-check escrow legs.
pub fn authorize_group<S>(
    group: UnsignedGroup,
    signer: &S,
) -> Result<SignedGroup, ConstructionError>
where
    S: AccountSigner + ?Sized,
{
    let operations = group.operations();
    let mut legs = Vec::with_capacity(group.legs.len());

    for (index, (operation, leg_signer)) in group.legs.into_iter().enumerate() {
        let authorization = match leg_signer {
            LegSigner::Account(identity) => {
                let signer_address = signer.address_of(&identity)?;
                if signer_address != operation.sender {
                    return Err(ConstructionError::SignerMismatch {
                        index,
                        sender: operation.sender,
                        signer: signer_address,
                    });
                }
                LegAuthorization::Signature(signer.sign(&identity, &operation)?)
            }
            LegSigner::Escrow(rule) => {
                rule.authorize(&operations, index)
                    .map_err(|reason| ConstructionError::EscrowRefused { index, reason })?;
                LegAuthorization::Escrow(rule)
            }
        };
        legs.push(SignedOperation {
            operation,
            authorization,
        });
    }

    Ok(SignedGroup { id: group.id, legs })
}
