use serde_json::{Value, json};

/// JSON ABI artifact, the shape wallets and `ethers`/`viem` consume.
pub fn abi_json() -> Value {
    json!([
        {
            "type": "function",
            "name": "signGuestbook",
            "stateMutability": "payable",
            "inputs": [
                { "name": "_name", "type": "string", "internalType": "string" },
                { "name": "_message", "type": "string", "internalType": "string" }
            ],
            "outputs": []
        },
        {
            "type": "function",
            "name": "getEntries",
            "stateMutability": "view",
            "inputs": [],
            "outputs": [
                {
                    "name": "",
                    "type": "tuple[]",
                    "internalType": "struct PortfolioGuestbook.Entry[]",
                    "components": [
                        { "name": "author", "type": "address", "internalType": "address" },
                        { "name": "displayName", "type": "string", "internalType": "string" },
                        { "name": "message", "type": "string", "internalType": "string" },
                        { "name": "timestamp", "type": "uint256", "internalType": "uint256" },
                        { "name": "hasTipped", "type": "bool", "internalType": "bool" }
                    ]
                }
            ]
        }
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calls::{GET_ENTRIES_SIGNATURE, SIGN_GUESTBOOK_SIGNATURE};

    /// The canonical signatures must be derivable from the artifact.
    #[test]
    fn artifact_matches_signatures() {
        let abi = abi_json();
        let functions = abi.as_array().unwrap();
        let signature = |f: &Value| {
            let inputs: Vec<&str> = f["inputs"]
                .as_array()
                .unwrap()
                .iter()
                .map(|i| i["type"].as_str().unwrap())
                .collect();
            format!("{}({})", f["name"].as_str().unwrap(), inputs.join(","))
        };
        assert_eq!(signature(&functions[0]), SIGN_GUESTBOOK_SIGNATURE);
        assert_eq!(signature(&functions[1]), GET_ENTRIES_SIGNATURE);
        assert_eq!(functions[0]["stateMutability"], "payable");
        assert_eq!(functions[1]["outputs"][0]["components"].as_array().unwrap().len(), 5);
    }
}
