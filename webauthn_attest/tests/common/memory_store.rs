use std::collections::HashMap;
use std::sync::Mutex;

use webauthn_attest::{CredentialStore, RegistrationResult, StoredCredential, WebauthnError};

/// Credential store backed by a HashMap, keyed by credential id.
#[derive(Default)]
pub struct MemoryStore {
    credentials: Mutex<HashMap<Vec<u8>, StoredCredential>>,
}

impl MemoryStore {
    pub fn sign_count(&self, credential_id: &[u8]) -> Option<u32> {
        self.credentials
            .lock()
            .unwrap()
            .get(credential_id)
            .map(|credential| credential.sign_count)
    }

    pub fn len(&self) -> usize {
        self.credentials.lock().unwrap().len()
    }
}

impl CredentialStore for MemoryStore {
    fn find_credential(&self, credential_id: &[u8]) -> Result<Option<StoredCredential>, WebauthnError> {
        Ok(self.credentials.lock().unwrap().get(credential_id).cloned())
    }

    fn register_credential(
        &self,
        user_handle: &[u8],
        result: &RegistrationResult,
    ) -> Result<(), WebauthnError> {
        let credential = StoredCredential {
            credential_id: result.credential_id.to_vec(),
            user_handle: user_handle.to_vec(),
            public_key: result.credential_public_key.clone(),
            sign_count: result.sign_count,
        };
        self.credentials
            .lock()
            .unwrap()
            .insert(credential.credential_id.clone(), credential);
        Ok(())
    }

    fn update_sign_count(&self, credential_id: &[u8], sign_count: u32) -> Result<(), WebauthnError> {
        let mut credentials = self.credentials.lock().unwrap();
        let credential = credentials
            .get_mut(credential_id)
            .ok_or_else(|| WebauthnError::Credential("Unknown credential".to_string()))?;
        credential.sign_count = sign_count;
        Ok(())
    }
}
