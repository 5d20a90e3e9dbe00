//! Candidate directory and popup filtering.

use crate::types::{Candidate, CandidateId};

/// The people that can be mentioned, plus the acting user.
#[derive(Debug, Clone)]
pub struct CandidateDirectory {
    candidates: Vec<Candidate>,
    current_user: Candidate,
}

impl CandidateDirectory {
    pub fn new(candidates: Vec<Candidate>, current_user: Candidate) -> Self {
        Self {
            candidates,
            current_user,
        }
    }

    pub fn candidates(&self) -> &[Candidate] {
        &self.candidates
    }

    pub fn current_user(&self) -> &Candidate {
        &self.current_user
    }

    pub fn get(&self, id: CandidateId) -> Option<&Candidate> {
        find_by_id(&self.candidates, id)
    }

    /// Candidates in the acting user's organization whose name contains `query`.
    ///
    /// Matching ignores case and keeps directory order. An empty query
    /// matches everyone in the organization.
    pub fn eligible(&self, query: &str) -> Vec<&Candidate> {
        let query = query.to_lowercase();
        self.candidates
            .iter()
            .filter(|c| c.organization_id == self.current_user.organization_id)
            .filter(|c| c.display_name.to_lowercase().contains(&query))
            .collect()
    }
}

pub(crate) fn find_by_id(candidates: &[Candidate], id: CandidateId) -> Option<&Candidate> {
    candidates.iter().find(|c| c.id == id)
}

/// First candidate with exactly this display name.
pub(crate) fn find_by_name<'a>(candidates: &'a [Candidate], name: &str) -> Option<&'a Candidate> {
    candidates.iter().find(|c| c.display_name.as_str() == name)
}
