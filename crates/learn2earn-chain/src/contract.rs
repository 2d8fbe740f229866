//! The Learn2Earn contract.
//!
//! [`LEARN2EARN_ABI`] describes the deployed contract. [`Learn2EarnContract`]
//! builds write clauses for a [`TransactionSigner`](crate::TransactionSigner)
//! and decodes reads made through a [`ContractReader`] into typed records.

use serde::Serialize;
use tracing::debug;

use crate::abi::{AbiFunction, AbiParam, AbiType, AbiValue, Mutability};
use crate::{ChainError, Clause, ContractReader, Result};

/// Default deployment address on the test network.
pub const DEFAULT_CONTRACT_ADDRESS: &str = "0x1005b10c23c3269eeb5735347347e7b0625da156";

static REFERRAL: AbiType = AbiType::Tuple(&[
    AbiParam::new("referrer", AbiType::Address),
    AbiParam::new("referee", AbiType::Address),
    AbiParam::new("timestamp", AbiType::Uint256),
    AbiParam::new("confirmed", AbiType::Bool),
    AbiParam::new("rewardClaimed", AbiType::Bool),
]);

/// Functions exposed by the Learn2Earn contract.
pub static LEARN2EARN_ABI: &[AbiFunction] = &[
    AbiFunction {
        name: "addStudent",
        inputs: &[],
        outputs: &[],
        mutability: Mutability::Payable,
    },
    AbiFunction {
        name: "students",
        inputs: &[AbiParam::new("", AbiType::Address)],
        outputs: &[
            AbiParam::new("wallet", AbiType::Address),
            AbiParam::new("registered", AbiType::Bool),
            AbiParam::new("graduated", AbiType::Bool),
            AbiParam::new("certificate", AbiType::Bytes32),
        ],
        mutability: Mutability::View,
    },
    AbiFunction {
        name: "completeCourse",
        inputs: &[AbiParam::new("courseId", AbiType::String)],
        outputs: &[],
        mutability: Mutability::NonPayable,
    },
    AbiFunction {
        name: "isCourseCompleted",
        inputs: &[
            AbiParam::new("studentAddress", AbiType::Address),
            AbiParam::new("courseId", AbiType::String),
        ],
        outputs: &[AbiParam::new("", AbiType::Bool)],
        mutability: Mutability::View,
    },
    AbiFunction {
        name: "updateProfile",
        inputs: &[
            AbiParam::new("_profilePicture", AbiType::String),
            AbiParam::new("_bio", AbiType::String),
            AbiParam::new("_experience", AbiType::String),
            AbiParam::new("_skills", AbiType::String),
            AbiParam::new("_lookingForReferral", AbiType::Bool),
        ],
        outputs: &[],
        mutability: Mutability::NonPayable,
    },
    AbiFunction {
        name: "deleteAccount",
        inputs: &[],
        outputs: &[],
        mutability: Mutability::NonPayable,
    },
    AbiFunction {
        name: "getProfile",
        inputs: &[AbiParam::new("userAddress", AbiType::Address)],
        outputs: &[
            AbiParam::new("profilePicture", AbiType::String),
            AbiParam::new("bio", AbiType::String),
            AbiParam::new("experience", AbiType::String),
            AbiParam::new("skills", AbiType::String),
            AbiParam::new("lookingForReferral", AbiType::Bool),
            AbiParam::new("profileCreated", AbiType::Bool),
            AbiParam::new("accountDeleted", AbiType::Bool),
        ],
        mutability: Mutability::View,
    },
    AbiFunction {
        name: "getCompletedCourses",
        inputs: &[AbiParam::new("studentAddress", AbiType::Address)],
        outputs: &[AbiParam::new("", AbiType::Array(&AbiType::String))],
        mutability: Mutability::View,
    },
    AbiFunction {
        name: "referUser",
        inputs: &[AbiParam::new("_referee", AbiType::Address)],
        outputs: &[],
        mutability: Mutability::NonPayable,
    },
    AbiFunction {
        name: "confirmReferral",
        inputs: &[AbiParam::new("_referrer", AbiType::Address)],
        outputs: &[],
        mutability: Mutability::NonPayable,
    },
    AbiFunction {
        name: "claimReferralReward",
        inputs: &[AbiParam::new("_referee", AbiType::Address)],
        outputs: &[],
        mutability: Mutability::NonPayable,
    },
    AbiFunction {
        name: "getReferralsReceived",
        inputs: &[AbiParam::new("userAddress", AbiType::Address)],
        outputs: &[AbiParam::new("", AbiType::Array(&REFERRAL))],
        mutability: Mutability::View,
    },
    AbiFunction {
        name: "getReferralsGiven",
        inputs: &[AbiParam::new("userAddress", AbiType::Address)],
        outputs: &[AbiParam::new("", AbiType::Array(&REFERRAL))],
        mutability: Mutability::View,
    },
];

/// Looks up a Learn2Earn function by name.
pub fn function(name: &str) -> Result<&'static AbiFunction> {
    LEARN2EARN_ABI
        .iter()
        .find(|f| f.name == name)
        .ok_or_else(|| ChainError::UnknownFunction(name.to_string()))
}

/// Entry of the `students` mapping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentRecord {
    /// Registered wallet.
    pub wallet: String,
    /// Whether the wallet registered as a student.
    pub registered: bool,
    /// Whether the student graduated.
    pub graduated: bool,
    /// Certificate hash as `0x` hex.
    pub certificate: String,
}

/// Public profile of a student.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    /// Picture URL.
    pub profile_picture: String,
    /// Free-form biography.
    pub bio: String,
    /// Experience summary.
    pub experience: String,
    /// Skills list as entered.
    pub skills: String,
    /// Whether the student wants referrals.
    pub looking_for_referral: bool,
    /// Whether a profile was ever saved.
    pub profile_created: bool,
    /// Whether the account was deleted.
    pub account_deleted: bool,
}

/// Fields written by `updateProfile`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfileUpdate {
    /// Picture URL.
    pub profile_picture: String,
    /// Free-form biography.
    pub bio: String,
    /// Experience summary.
    pub experience: String,
    /// Skills list.
    pub skills: String,
    /// Whether the student wants referrals.
    pub looking_for_referral: bool,
}

/// A referral between two students.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Referral {
    /// Referring student.
    pub referrer: String,
    /// Referred student.
    pub referee: String,
    /// Unix timestamp of the referral.
    pub timestamp: u64,
    /// Whether the referee confirmed.
    pub confirmed: bool,
    /// Whether the referrer claimed the reward.
    pub reward_claimed: bool,
}

/// Typed access to a deployed Learn2Earn contract.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Learn2EarnContract {
    address: String,
}

impl Default for Learn2EarnContract {
    fn default() -> Self {
        Self {
            address: DEFAULT_CONTRACT_ADDRESS.to_string(),
        }
    }
}

impl Learn2EarnContract {
    /// Creates a handle for the contract at `address`.
    pub fn new(address: &str) -> Result<Self> {
        match AbiValue::address(address)? {
            AbiValue::Address(address) => Ok(Self { address }),
            _ => Err(ChainError::InvalidAddress(address.to_string())),
        }
    }

    /// Contract address.
    pub fn address(&self) -> &str {
        &self.address
    }

    /// Builds a clause calling `name` with `args`.
    pub fn clause(&self, name: &str, args: &[AbiValue]) -> Result<Clause> {
        let function = function(name)?;
        let data = function.encode_call(args)?;
        debug!(function = name, bytes = data.len(), "Encoded contract call");
        Ok(Clause::new(self.address.clone(), &data))
    }

    // ========================================================================
    // Writes
    // ========================================================================

    /// `addStudent()`
    pub fn add_student(&self) -> Result<Clause> {
        self.clause("addStudent", &[])
    }

    /// `completeCourse(courseId)`
    pub fn complete_course(&self, course_id: &str) -> Result<Clause> {
        self.clause("completeCourse", &[AbiValue::string(course_id)])
    }

    /// `updateProfile(...)`
    pub fn update_profile(&self, update: &ProfileUpdate) -> Result<Clause> {
        self.clause(
            "updateProfile",
            &[
                AbiValue::string(update.profile_picture.as_str()),
                AbiValue::string(update.bio.as_str()),
                AbiValue::string(update.experience.as_str()),
                AbiValue::string(update.skills.as_str()),
                AbiValue::Bool(update.looking_for_referral),
            ],
        )
    }

    /// `deleteAccount()`
    pub fn delete_account(&self) -> Result<Clause> {
        self.clause("deleteAccount", &[])
    }

    /// `referUser(referee)`
    pub fn refer_user(&self, referee: &str) -> Result<Clause> {
        self.clause("referUser", &[AbiValue::address(referee)?])
    }

    /// `confirmReferral(referrer)`
    pub fn confirm_referral(&self, referrer: &str) -> Result<Clause> {
        self.clause("confirmReferral", &[AbiValue::address(referrer)?])
    }

    /// `claimReferralReward(referee)`
    pub fn claim_referral_reward(&self, referee: &str) -> Result<Clause> {
        self.clause("claimReferralReward", &[AbiValue::address(referee)?])
    }

    // ========================================================================
    // Reads
    // ========================================================================

    async fn read<R>(&self, reader: &R, name: &str, args: &[AbiValue]) -> Result<Vec<AbiValue>>
    where
        R: ContractReader + ?Sized,
    {
        let clause = self.clause(name, args)?;
        let output = reader.call(&clause).await?;
        function(name)?.decode_output(&output)
    }

    /// Reads the `students` entry for `student`.
    pub async fn student<R>(&self, reader: &R, student: &str) -> Result<StudentRecord>
    where
        R: ContractReader + ?Sized,
    {
        let values = self
            .read(reader, "students", &[AbiValue::address(student)?])
            .await?;
        decode_student(values)
    }

    /// Reads whether `student` completed `course_id`.
    pub async fn is_course_completed<R>(&self, reader: &R, student: &str, course_id: &str) -> Result<bool>
    where
        R: ContractReader + ?Sized,
    {
        let values = self
            .read(
                reader,
                "isCourseCompleted",
                &[AbiValue::address(student)?, AbiValue::string(course_id)],
            )
            .await?;
        match values.as_slice() {
            [AbiValue::Bool(done)] => Ok(*done),
            _ => Err(unexpected("isCourseCompleted")),
        }
    }

    /// Reads the profile of `user`.
    pub async fn profile<R>(&self, reader: &R, user: &str) -> Result<Profile>
    where
        R: ContractReader + ?Sized,
    {
        let values = self
            .read(reader, "getProfile", &[AbiValue::address(user)?])
            .await?;
        decode_profile(values)
    }

    /// Reads the ids of courses `student` completed.
    pub async fn completed_courses<R>(&self, reader: &R, student: &str) -> Result<Vec<String>>
    where
        R: ContractReader + ?Sized,
    {
        let values = self
            .read(reader, "getCompletedCourses", &[AbiValue::address(student)?])
            .await?;
        match values.into_iter().next() {
            Some(AbiValue::Array(items)) => items
                .into_iter()
                .map(|item| match item {
                    AbiValue::String(id) => Ok(id),
                    _ => Err(unexpected("getCompletedCourses")),
                })
                .collect(),
            _ => Err(unexpected("getCompletedCourses")),
        }
    }

    /// Reads referrals `user` received.
    pub async fn referrals_received<R>(&self, reader: &R, user: &str) -> Result<Vec<Referral>>
    where
        R: ContractReader + ?Sized,
    {
        let values = self
            .read(reader, "getReferralsReceived", &[AbiValue::address(user)?])
            .await?;
        decode_referrals("getReferralsReceived", values)
    }

    /// Reads referrals `user` gave.
    pub async fn referrals_given<R>(&self, reader: &R, user: &str) -> Result<Vec<Referral>>
    where
        R: ContractReader + ?Sized,
    {
        let values = self
            .read(reader, "getReferralsGiven", &[AbiValue::address(user)?])
            .await?;
        decode_referrals("getReferralsGiven", values)
    }
}

fn unexpected(function: &str) -> ChainError {
    ChainError::Decode(format!("unexpected {function}() output"))
}

fn decode_student(values: Vec<AbiValue>) -> Result<StudentRecord> {
    match <[AbiValue; 4]>::try_from(values) {
        Ok(
            [AbiValue::Address(wallet), AbiValue::Bool(registered), AbiValue::Bool(graduated), AbiValue::Bytes32(certificate)],
        ) => Ok(StudentRecord {
            wallet,
            registered,
            graduated,
            certificate: format!("0x{}", hex::encode(certificate)),
        }),
        _ => Err(unexpected("students")),
    }
}

fn decode_profile(values: Vec<AbiValue>) -> Result<Profile> {
    match <[AbiValue; 7]>::try_from(values) {
        Ok(
            [AbiValue::String(profile_picture), AbiValue::String(bio), AbiValue::String(experience), AbiValue::String(skills), AbiValue::Bool(looking_for_referral), AbiValue::Bool(profile_created), AbiValue::Bool(account_deleted)],
        ) => Ok(Profile {
            profile_picture,
            bio,
            experience,
            skills,
            looking_for_referral,
            profile_created,
            account_deleted,
        }),
        _ => Err(unexpected("getProfile")),
    }
}

fn decode_referrals(function: &str, values: Vec<AbiValue>) -> Result<Vec<Referral>> {
    let Some(AbiValue::Array(items)) = values.into_iter().next() else {
        return Err(unexpected(function));
    };
    items
        .into_iter()
        .map(|item| {
            let AbiValue::Tuple(fields) = item else {
                return Err(unexpected(function));
            };
            match <[AbiValue; 5]>::try_from(fields) {
                Ok(
                    [AbiValue::Address(referrer), AbiValue::Address(referee), AbiValue::Uint(timestamp), AbiValue::Bool(confirmed), AbiValue::Bool(reward_claimed)],
                ) => Ok(Referral {
                    referrer,
                    referee,
                    timestamp: u64::try_from(timestamp).map_err(|_| unexpected(function))?,
                    confirmed,
                    reward_claimed,
                }),
                _ => Err(unexpected(function)),
            }
        })
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use async_trait::async_trait;

    use super::*;
    use crate::abi::keccak256;

    const STUDENT: &str = "0x00000000000000000000000000000000000000aa";

    /// Answers every call with a fixed payload and remembers the last clause.
    struct FixedReader {
        output: Vec<u8>,
        seen: parking_lot::Mutex<Option<Clause>>,
    }

    impl FixedReader {
        fn new(output: Vec<u8>) -> Self {
            Self {
                output,
                seen: parking_lot::Mutex::new(None),
            }
        }
    }

    #[async_trait]
    impl ContractReader for FixedReader {
        async fn call(&self, clause: &Clause) -> Result<Vec<u8>> {
            *self.seen.lock() = Some(clause.clone());
            Ok(self.output.clone())
        }
    }

    fn word(n: u8) -> Vec<u8> {
        let mut w = vec![0u8; 32];
        w[31] = n;
        w
    }

    #[test]
    fn test_abi_lists_every_contract_function() {
        let names: Vec<&str> = LEARN2EARN_ABI.iter().map(|f| f.name).collect();
        for expected in [
            "addStudent",
            "students",
            "completeCourse",
            "isCourseCompleted",
            "updateProfile",
            "deleteAccount",
            "getProfile",
            "getCompletedCourses",
            "referUser",
            "confirmReferral",
            "claimReferralReward",
        ] {
            assert!(names.contains(&expected), "missing {expected}");
        }
    }

    #[test]
    fn test_unknown_function() {
        assert!(matches!(function("mint"), Err(ChainError::UnknownFunction(_))));
    }

    #[test]
    fn test_complete_course_clause() {
        let contract = Learn2EarnContract::default();
        let clause = contract.complete_course("python-basics").unwrap();
        let selector = hex::encode(&keccak256(b"completeCourse(string)")[..4]);
        assert!(clause.data.starts_with(&format!("0x{selector}")));
        assert_eq!(clause.to, DEFAULT_CONTRACT_ADDRESS);
        assert_eq!(clause.value, "0x0");
    }

    #[test]
    fn test_tuple_array_signature() {
        assert_eq!(
            function("getReferralsGiven").unwrap().outputs[0].kind.to_string(),
            "(address,address,uint256,bool,bool)[]"
        );
        assert_eq!(function("updateProfile").unwrap().signature(), "updateProfile(string,string,string,string,bool)");
    }

    #[test]
    fn test_invalid_contract_address() {
        assert!(Learn2EarnContract::new("not-an-address").is_err());
        let contract = Learn2EarnContract::new("0x1005B10C23C3269EEB5735347347E7B0625DA156").unwrap();
        assert_eq!(contract.address(), DEFAULT_CONTRACT_ADDRESS);
    }

    #[test]
    fn test_refer_user_validates_address() {
        let contract = Learn2EarnContract::default();
        assert!(matches!(contract.refer_user("bob"), Err(ChainError::InvalidAddress(_))));
        assert!(contract.refer_user(STUDENT).is_ok());
    }

    #[tokio::test]
    async fn test_read_student_record() {
        let mut output = vec![0u8; 12];
        output.extend([0u8; 19]);
        output.push(0xaa);
        output.extend(word(1));
        output.extend(word(0));
        output.extend([7u8; 32]);
        let reader = FixedReader::new(output);

        let record = Learn2EarnContract::default().student(&reader, STUDENT).await.unwrap();
        assert_eq!(record.wallet, STUDENT);
        assert!(record.registered);
        assert!(!record.graduated);
        assert_eq!(record.certificate, format!("0x{}", "07".repeat(32)));

        let seen = reader.seen.lock().clone().unwrap();
        let selector = hex::encode(&keccak256(b"students(address)")[..4]);
        assert!(seen.data.starts_with(&format!("0x{selector}")));
    }

    #[tokio::test]
    async fn test_read_course_completion_flag() {
        let reader = FixedReader::new(word(1));
        let done = Learn2EarnContract::default()
            .is_course_completed(&reader, STUDENT, "python-basics")
            .await
            .unwrap();
        assert!(done);
    }

    #[tokio::test]
    async fn test_read_completed_courses() {
        let mut output = word(32);
        output.extend(word(1));
        output.extend(word(32));
        output.extend(word(2));
        let mut text = b"py".to_vec();
        text.resize(32, 0);
        output.extend(text);
        let reader = FixedReader::new(output);

        let courses = Learn2EarnContract::default()
            .completed_courses(&reader, STUDENT)
            .await
            .unwrap();
        assert_eq!(courses, vec!["py"]);
    }

    #[tokio::test]
    async fn test_read_rejects_short_output() {
        let reader = FixedReader::new(word(1));
        let result = Learn2EarnContract::default().profile(&reader, STUDENT).await;
        assert!(matches!(result, Err(ChainError::Decode(_))));
    }
}
