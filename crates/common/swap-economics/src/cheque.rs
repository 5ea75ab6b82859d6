use swap_identity::{recover_address, Owner};
use swap_types::{Address, Cheque, ChequeError, ChequeParams};

/// Sign `params` with the owner's key.
pub fn sign_cheque(params: ChequeParams, owner: &Owner) -> Result<Cheque, ChequeError> {
    let signature = owner
        .sign_hash(&params.sig_hash())
        .map_err(|e| ChequeError::Signing(e.to_string()))?;
    Ok(Cheque { params, signature: signature.to_vec() })
}

/// Address whose key produced the cheque's signature.
pub fn recover_cheque_signer(cheque: &Cheque) -> Result<Address, ChequeError> {
    recover_address(&cheque.params.sig_hash(), &cheque.signature)
        .map_err(|e| ChequeError::SignatureRecovery(e.to_string()))
}

/// Fails with [`ChequeError::InvalidSignature`] unless `expected` signed the cheque.
pub fn verify_cheque_signer(cheque: &Cheque, expected: Address) -> Result<(), ChequeError> {
    match recover_cheque_signer(cheque) {
        Ok(signer) if signer == expected => Ok(()),
        _ => Err(ChequeError::InvalidSignature),
    }
}
