#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capability {
    read: bool,
    write: bool,
}

impl Capability {
    pub fn read_only() -> Self {
        Self { read: true, write: false }
    }

    pub fn read_write() -> Self {
        Self { read: true, write: true }
    }

    pub fn can_read(&self) -> bool {
        self.read
    }

    pub fn can_write(&self) -> bool {
        self.write
    }
}

pub trait AccessGate: Send + Sync {
    fn authorize(&self, login: &str, password: &str) -> Option<Capability>;
}

// Demo gate: plain string comparison, no hashing, no lockout.
#[derive(Debug, Clone)]
pub struct FixedCredentialGate {
    login: String,
    password: String,
}

impl FixedCredentialGate {
    pub fn new(login: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            login: login.into(),
            password: password.into(),
        }
    }
}

impl AccessGate for FixedCredentialGate {
    fn authorize(&self, login: &str, password: &str) -> Option<Capability> {
        (login == self.login && password == self.password).then(Capability::read_write)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_gate_grants_write_on_exact_match() {
        let gate = FixedCredentialGate::new("compound", "secret");
        let capability = gate.authorize("compound", "secret").expect("authorized");
        assert!(capability.can_read());
        assert!(capability.can_write());
    }

    #[test]
    fn fixed_gate_rejects_anything_else() {
        let gate = FixedCredentialGate::new("compound", "secret");
        assert!(gate.authorize("compound", "Secret").is_none());
        assert!(gate.authorize("other", "secret").is_none());
        assert!(gate.authorize("", "").is_none());
    }

    #[test]
    fn read_only_cannot_write() {
        let capability = Capability::read_only();
        assert!(capability.can_read());
        assert!(!capability.can_write());
    }
}
