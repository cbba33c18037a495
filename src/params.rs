use serde::{Deserialize, Serialize};

use crate::types::{Address, CallHash, MultisigId, Percent, Stance};

macro_rules! define_args_struct {
    (
        $struct_name:ident {
            $($field_name:ident: $field_type:ty),* $(,)?
        }
    ) => {
        #[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
        pub struct $struct_name {
            $(pub $field_name: $field_type,)*
        }

        impl $struct_name {
            #[allow(clippy::too_many_arguments)]
            pub fn new(
                $($field_name: $field_type,)*
            ) -> Self {
                Self {
                    $($field_name,)*
                }
            }
        }
    };
}

define_args_struct!(AddMemberArgs {
    address: Address,
    amount: u128,
});

define_args_struct!(RemoveMemberArgs {
    address: Address,
});

define_args_struct!(SendExternalCallArgs {
    destination: String,
    weight: u64,
    call_data: Vec<u8>,
});

define_args_struct!(TransferExternalAssetArgs {
    destination: String,
    asset: String,
    amount: u128,
    to: Address,
});

define_args_struct!(SetParametersArgs {
    metadata: Option<Vec<u8>>,
    minimum_support: Option<Percent>,
    required_approval: Option<Percent>,
    frozen_tokens: Option<bool>,
});

define_args_struct!(VoteOnMultisigArgs {
    multisig: MultisigId,
    call_hash: CallHash,
    stance: Stance,
});
